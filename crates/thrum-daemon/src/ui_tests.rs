use super::*;

#[test]
fn embedded_index_is_served_for_the_root_path() {
    let bytes = lookup("index.html", false).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("thrum"));
}

#[test]
fn unknown_embedded_path_falls_back_to_index() {
    let direct = lookup("index.html", false).unwrap();
    let fallback = lookup("no-such-asset.js", false).unwrap();
    assert_eq!(direct, fallback);
}

#[test]
fn ui_dev_reads_straight_off_disk() {
    let bytes = lookup("index.html", true).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("thrum"));
}
