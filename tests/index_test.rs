mod helpers;

use std::fs;
use std::path::PathBuf;

use helpers::temp_index;

fn write_tree(root: &std::path::Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("src/lib.rs"),
        "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\npub fn sub(a: i32, b: i32) -> i32 {\n    a - b\n}\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# demo\n\nA tiny crate.\n").unwrap();
    fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G', 0, 0]).unwrap();
}

#[test]
fn first_run_indexes_everything() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("repo");
    write_tree(&root);

    let result = index.index(&[root], true).unwrap();
    assert_eq!(result.status, "success");
    assert_eq!(result.files, 2);
    // 7 lines in windows of 4 with overlap 1, plus the README
    assert_eq!(result.chunks, 3);
    assert_eq!(result.partition.len(), "YYYY-MM-DD".len());

    let manifest = index.manifest().unwrap();
    assert_eq!(manifest.total_chunks, 3);
    assert_eq!(manifest.dimension, Some(16));
    assert_eq!(manifest.model.as_deref(), Some("hash-sha256-16"));
    let partition = &manifest.partitions[&result.partition];
    assert_eq!(partition.file_count, 2);

    let part_dir = index.dir().join(&result.partition);
    assert!(part_dir.join("chunks.jsonl").exists());
    assert!(part_dir.join("partition.json").exists());
    assert_eq!(index.file_states().unwrap().len(), 2);
}

#[test]
fn incremental_run_skips_unchanged_files() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("repo");
    write_tree(&root);
    index.index(&[root.clone()], true).unwrap();

    let again = index.index(&[root.clone()], true).unwrap();
    assert_eq!(again.files, 0);
    assert_eq!(again.chunks, 0);
    assert_eq!(again.skipped_files, 2);

    fs::write(root.join("README.md"), "# demo\n\nNow with more words.\n").unwrap();
    let changed = index.index(&[root.clone()], true).unwrap();
    assert_eq!(changed.files, 1);
    assert_eq!(changed.chunks, 1);

    let full = index.index(&[root], false).unwrap();
    assert_eq!(full.files, 2);
}

#[test]
fn search_ignores_superseded_chunks() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("repo");
    write_tree(&root);
    index.index(&[root.clone()], true).unwrap();

    let readme = root.join("README.md");
    fs::write(&readme, "# demo\n\nrewritten readme\n").unwrap();
    index.index(&[root.clone()], true).unwrap();

    let hits = index.search("# demo\n\nrewritten readme", 10).unwrap();
    let readme_key = fs::canonicalize(&readme).unwrap().to_string_lossy().into_owned();
    let readme_hits: Vec<_> = hits.iter().filter(|h| h.path == readme_key).collect();
    assert_eq!(readme_hits.len(), 1);
    assert_eq!(readme_hits[0].text, "# demo\n\nrewritten readme");
    // exact text match ranks first under the hash provider
    assert_eq!(hits[0].path, readme_key);
    assert!((hits[0].score - 1.0).abs() < 1e-5);
    // total current chunks: two from lib.rs, one from the README
    assert_eq!(hits.len(), 3);
}

#[test]
fn full_reindex_does_not_duplicate_results() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("repo");
    write_tree(&root);
    index.index(&[root.clone()], true).unwrap();
    index.index(&[root.clone()], false).unwrap();

    let hits = index.search("anything", 10).unwrap();
    assert_eq!(hits.len(), 3);

    // counts describe the live chunks, not every line ever written
    let manifest = index.manifest().unwrap();
    assert_eq!(manifest.total_chunks, 3);
    let partition = manifest.partitions.values().next().unwrap();
    assert_eq!(partition.chunk_count, 3);
    assert_eq!(partition.file_count, 2);
}

#[test]
fn explicit_file_and_missing_path() {
    let (dir, index) = temp_index(16);
    let file = dir.path().join("Makefile");
    fs::write(&file, "all:\n\techo hi\n").unwrap();

    let result = index
        .index(&[file, PathBuf::from("/nonexistent/vellum/path")], true)
        .unwrap();
    assert_eq!(result.files, 1);
    assert_eq!(result.chunks, 1);
}

#[test]
fn corrupt_chunk_lines_are_skipped() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("repo");
    write_tree(&root);
    let result = index.index(&[root], true).unwrap();

    let chunks = index.dir().join(&result.partition).join("chunks.jsonl");
    let mut body = fs::read_to_string(&chunks).unwrap();
    body.push_str("{\"id\":\"torn");
    fs::write(&chunks, body).unwrap();

    assert_eq!(index.search("add", 10).unwrap().len(), 3);
}

#[test]
fn reindex_after_torn_tail_keeps_new_chunks() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("notes");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.md"), "alpha\n").unwrap();
    fs::write(root.join("b.md"), "beta\n").unwrap();
    let result = index.index(&[root.clone()], true).unwrap();

    let chunks = index.dir().join(&result.partition).join("chunks.jsonl");
    let mut body = fs::read_to_string(&chunks).unwrap();
    body.push_str("{\"id\":\"torn");
    fs::write(&chunks, body).unwrap();

    fs::write(root.join("a.md"), "alpha, revised\n").unwrap();
    let again = index.index(&[root], true).unwrap();
    assert_eq!((again.files, again.chunks), (1, 1));

    let hits = index.search("alpha, revised", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].text, "alpha, revised");
}

#[test]
fn deleted_files_leave_search() {
    let (dir, index) = temp_index(16);
    let root = dir.path().join("repo");
    write_tree(&root);
    index.index(&[root.clone()], true).unwrap();

    fs::remove_file(root.join("README.md")).unwrap();
    let result = index.index(&[root.clone()], true).unwrap();
    assert_eq!(result.pruned_files, 1);
    assert_eq!(result.files, 0);

    let hits = index.search("# demo", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.path.ends_with("lib.rs")));
    assert_eq!(index.file_states().unwrap().len(), 1);
    assert_eq!(index.manifest().unwrap().total_chunks, 2);
}
