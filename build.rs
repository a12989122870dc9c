fn main() {
    println!("cargo:rerun-if-changed=resources/recaps.rc");

    if let Err(e) = embed_resource::compile("resources/recaps.rc", embed_resource::NONE)
        .manifest_optional()
    {
        println!("cargo:warning=version resource was not embedded: {e}");
    }
}
