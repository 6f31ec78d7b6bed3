use std::env;
use std::path::PathBuf;

fn main() {
    if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
        std::env::set_var("PROTOC", path);
    }
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("missing manifest dir"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root");
    let proto_dir = workspace_root.join("proto");
    let proto_file = proto_dir.join("recipes.proto");

    println!("cargo:rerun-if-changed={}", proto_file.display());

    prost_build::Config::new()
        .out_dir(PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR")))
        .compile_protos(&[proto_file], &[proto_dir])
        .expect("compile protos");
}
