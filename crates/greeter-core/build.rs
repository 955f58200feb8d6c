/// Builds the gRPC client and server code for the `helloworld.proto` definition
/// using `tonic-prost-build`.
///
/// The generated module is included by `greeter_core::proto` and a file
/// descriptor set is written next to it so the server can expose reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/helloworld.proto`
/// - Includes: `proto/`
/// - Descriptor: `$OUT_DIR/helloworld_descriptor.bin`
///
/// # Panics
///
/// Panics if code generation fails.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("helloworld_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/helloworld.proto"], &["proto"])
        .unwrap();

    println!("cargo:rerun-if-changed=proto/helloworld.proto");
}
