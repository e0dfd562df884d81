//! End-to-end flows over real directories: the read-merge-replace pipeline
//! that sequential CI jobs exercise, and the intermediate-then-reduce
//! pipeline used when jobs write per-architecture fragments.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use koplib_core::{
    build_library, decode, library_path, reduce_intermediates, BuildRequest, DocumentFormat,
    LibraryFormat, MergePolicy, ReduceRequest,
};

fn seed_arch_docs(meta_dir: &Path, arch: &str, ops: &[(&str, &str)]) {
    fs::create_dir_all(meta_dir).unwrap();
    for (op, io_type) in ops {
        let body = format!(
            "arch: {arch}\nop: {op}\nio_type: {io_type}\nworkgroup: [256, 1, 1]\nversion: 3\n"
        );
        fs::write(meta_dir.join(format!("{op}_{io_type}_{arch}.yaml")), body).unwrap();
    }
}

fn build_request(root: &Path, arch: &str, intermediate: bool) -> BuildRequest {
    BuildRequest {
        src_dir: root.join("meta"),
        co_path: PathBuf::from(format!("/ci/build/kernels_{arch}.co")),
        arch: arch.to_string(),
        input_format: DocumentFormat::Yaml,
        output_format: LibraryFormat::Dat,
        output_dir: root.join("artifacts"),
        intermediate,
    }
}

#[test]
fn sequential_jobs_accumulate_architectures() {
    let temp = TempDir::new().unwrap();
    seed_arch_docs(&temp.path().join("meta"), "gfx90a", &[("gemm", "f16"), ("trsm", "f32")]);
    seed_arch_docs(&temp.path().join("meta"), "gfx942", &[("gemm", "bf16")]);

    build_library(&build_request(temp.path(), "gfx90a", false)).unwrap();
    let dest = build_library(&build_request(temp.path(), "gfx942", false)).unwrap();

    let index = decode(&fs::read(&dest).unwrap(), LibraryFormat::Dat).unwrap();
    assert_eq!(index.arches.len(), 2);
    assert_eq!(index.record_count(), 3);
    assert_eq!(
        index.arches["gfx90a"]["gemm"]["f16"][0].co_path,
        "kernels_gfx90a.co"
    );
    assert_eq!(
        index.arches["gfx942"]["gemm"]["bf16"][0].co_path,
        "kernels_gfx942.co"
    );
}

#[test]
fn intermediate_then_reduce_matches_direct_builds() {
    let temp = TempDir::new().unwrap();
    seed_arch_docs(&temp.path().join("meta"), "gfx90a", &[("gemm", "f16")]);
    seed_arch_docs(&temp.path().join("meta"), "gfx942", &[("gemm", "bf16")]);

    let frag_a = build_library(&build_request(temp.path(), "gfx90a", true)).unwrap();
    let frag_b = build_library(&build_request(temp.path(), "gfx942", true)).unwrap();
    assert_ne!(frag_a, frag_b);

    let dest = reduce_intermediates(&ReduceRequest {
        output_dir: temp.path().join("artifacts"),
        output_format: LibraryFormat::Dat,
        policy: MergePolicy::Deep,
    })
    .unwrap();

    // Fragments are consumed, only the final library remains
    assert!(!frag_a.exists());
    assert!(!frag_b.exists());
    assert_eq!(dest, library_path(&temp.path().join("artifacts"), LibraryFormat::Dat));

    let index = decode(&fs::read(&dest).unwrap(), LibraryFormat::Dat).unwrap();
    assert_eq!(index.arches.len(), 2);
    assert_eq!(index.record_count(), 2);
}

#[test]
fn rebuilding_is_deterministic() {
    let temp = TempDir::new().unwrap();
    seed_arch_docs(
        &temp.path().join("meta"),
        "gfx90a",
        &[("gemm", "f16"), ("gemm", "f32"), ("softmax", "f16")],
    );

    let dest = build_library(&build_request(temp.path(), "gfx90a", false)).unwrap();
    let first = fs::read(&dest).unwrap();

    // Rebuilding over the published library replaces gfx90a with identical
    // content, so the destination is byte-identical
    build_library(&build_request(temp.path(), "gfx90a", false)).unwrap();
    let second = fs::read(&dest).unwrap();

    assert_eq!(first, second);
}

#[test]
fn text_formats_publish_interchangeably() {
    for output_format in [LibraryFormat::Yaml, LibraryFormat::Json] {
        let temp = TempDir::new().unwrap();
        seed_arch_docs(&temp.path().join("meta"), "gfx90a", &[("gemm", "f16")]);

        let mut request = build_request(temp.path(), "gfx90a", false);
        request.output_format = output_format;
        let dest = build_library(&request).unwrap();

        assert_eq!(
            dest.extension().unwrap().to_str().unwrap(),
            output_format.extension()
        );
        let index = decode(&fs::read(&dest).unwrap(), output_format).unwrap();
        assert_eq!(index.record_count(), 1);
    }
}
