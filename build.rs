fn main() {
    #[cfg(feature = "nfqueue")]
    generate_nfqueue_bindings();
}

#[cfg(feature = "nfqueue")]
fn generate_nfqueue_bindings() {
    println!("cargo:rerun-if-changed=wrapper.h");

    // Find and link against libnetfilter_queue + libnfnetlink
    let libs = pkg_config::Config::new()
        .probe("libnetfilter_queue")
        .expect("Could not find libnetfilter_queue via pkg-config");

    // Only the queue API is needed; the verdict call carries the rewritten buffer
    let mut bindgen = bindgen::Builder::default()
        .header("wrapper.h")
        .allowlist_function("nfq_.*")
        .allowlist_type("nfq_.*")
        .allowlist_type("nfgenmsg")
        .allowlist_var("NFQ_.*")
        .derive_debug(true)
        .derive_default(true);

    for include_path in libs.include_paths {
        bindgen = bindgen.clang_arg(format!("-I{}", include_path.display()));
    }

    let out_path = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
    bindgen
        .generate()
        .expect("Unable to generate libnetfilter_queue bindings")
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}
