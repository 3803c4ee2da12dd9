use dvcup_core::{
    Address, DirTree, ErrorKind, Hash, LocalFiles, LocalRemote, ObjectStore, PointerFile,
    UploadRequest, list, upload,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    _dirs: (TempDir, TempDir, TempDir),
    repo: std::path::PathBuf,
    cache: std::path::PathBuf,
    inputs: std::path::PathBuf,
}

fn fixture(pointer: &str) -> Fixture {
    let repo = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let inputs = TempDir::new().unwrap();

    fs::create_dir_all(repo.path().join(".dvc")).unwrap();
    fs::write(
        repo.path().join(".dvc/config"),
        format!(
            "[core]\n    remote = storage\n['remote \"storage\"']\n    url = {}\n",
            cache.path().display()
        ),
    )
    .unwrap();
    fs::write(repo.path().join("dataset.dvc"), pointer).unwrap();

    Fixture {
        repo: repo.path().to_path_buf(),
        cache: cache.path().to_path_buf(),
        inputs: inputs.path().to_path_buf(),
        _dirs: (repo, cache, inputs),
    }
}

fn input(fx: &Fixture, name: &str, data: &[u8]) -> String {
    let path = fx.inputs.join(name);
    fs::write(&path, data).unwrap();
    path.to_string_lossy().into_owned()
}

fn request(file: &str) -> UploadRequest<'_> {
    UploadRequest {
        file,
        pointer_path: "dataset.dvc",
        relpath: None,
        remote: None,
        message: None,
    }
}

fn pointer_address(repo: &Path) -> Option<Address> {
    let data = fs::read(repo.join("dataset.dvc")).unwrap();
    PointerFile::decode(&data, "dataset.dvc").unwrap().outs[0].md5
}

#[test]
fn first_upload_creates_manifest() {
    let fx = fixture("outs:\n- path: dataset\n");
    let file = input(&fx, "x.csv", b"a,b\n1,2\n");
    let mut tree = DirTree::new(&fx.repo);

    let report = upload(&mut tree, &LocalFiles, &request(&file)).unwrap();
    assert_eq!(report.relpath, "x.csv");
    assert_eq!(report.entries, 1);
    assert_eq!(report.size, 8);
    assert_eq!(report.file, Address::file(Hash::hash_bytes(b"a,b\n1,2\n")));

    let cache = LocalRemote::new(&fx.cache);
    assert_eq!(cache.get_bytes(&report.file).unwrap(), b"a,b\n1,2\n");

    let manifest_addr = report.pointer.address.unwrap();
    assert!(manifest_addr.is_directory());
    assert!(cache.exists(&manifest_addr).unwrap());
    assert_eq!(pointer_address(&fx.repo), Some(manifest_addr));
}

#[test]
fn second_upload_appends() {
    let fx = fixture("outs:\n- path: dataset\n");
    let a = input(&fx, "a.txt", b"first");
    let b = input(&fx, "b.txt", b"second");
    let mut tree = DirTree::new(&fx.repo);

    upload(&mut tree, &LocalFiles, &request(&a)).unwrap();
    let report = upload(&mut tree, &LocalFiles, &request(&b)).unwrap();
    assert_eq!(report.entries, 2);

    let (pointer, manifest) = list(&tree, "dataset.dvc", None).unwrap();
    assert_eq!(pointer, report.pointer);
    let relpaths: Vec<_> = manifest.entries().iter().map(|e| e.relpath.as_str()).collect();
    assert_eq!(relpaths, vec!["a.txt", "b.txt"]);
}

#[test]
fn relpath_override_is_recorded() {
    let fx = fixture("outs:\n- path: dataset\n");
    let file = input(&fx, "raw.bin", b"\x00\x01");
    let mut tree = DirTree::new(&fx.repo);

    let mut req = request(&file);
    req.relpath = Some("sub/dir/raw.bin");
    upload(&mut tree, &LocalFiles, &req).unwrap();

    let (_, manifest) = list(&tree, "dataset.dvc", None).unwrap();
    assert_eq!(manifest.entries()[0].relpath, "sub/dir/raw.bin");
}

#[test]
fn missing_manifest_leaves_pointer_untouched() {
    let ghost = Address::directory(Hash::hash_bytes(b"not in the cache"));
    let original = format!("outs:\n- md5: {}\n  path: dataset\n", ghost);
    let fx = fixture(&original);
    let file = input(&fx, "x.csv", b"data");
    let mut tree = DirTree::new(&fx.repo);

    let err = upload(&mut tree, &LocalFiles, &request(&file)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        fs::read_to_string(fx.repo.join("dataset.dvc")).unwrap(),
        original
    );
}

#[test]
fn relative_remote_is_rejected() {
    let fx = fixture("outs:\n- path: dataset\n");
    fs::write(
        fx.repo.join(".dvc/config"),
        "[core]\nremote = r\n['remote \"r\"']\nurl = relative/path\n",
    )
    .unwrap();
    let file = input(&fx, "x.csv", b"data");
    let mut tree = DirTree::new(&fx.repo);

    let err = upload(&mut tree, &LocalFiles, &request(&file)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidLocation);
}

#[test]
fn unknown_remote_override_is_not_found() {
    let fx = fixture("outs:\n- path: dataset\n");
    let file = input(&fx, "x.csv", b"data");
    let mut tree = DirTree::new(&fx.repo);

    let mut req = request(&file);
    req.remote = Some("elsewhere");
    let err = upload(&mut tree, &LocalFiles, &req).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("elsewhere"));
}
