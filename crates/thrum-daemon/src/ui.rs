// SPDX-License-Identifier: MIT

//! Static assets served on `/` by [`crate::rpc::ws`] (§4.8, §6.3
//! `THRUM_UI_DEV`). The UI itself is out of scope (§1 non-goals); only the
//! serving mechanism — embedded in release builds, read live from disk in
//! dev mode — is.

#[derive(rust_embed::RustEmbed)]
#[folder = "ui_dist/"]
pub struct Assets;

/// Directory `ui_dev` reads from, resolved at compile time relative to
/// this crate so `THRUM_UI_DEV=1` works from any working directory.
pub const UI_DEV_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/ui_dist");

/// Looks up `path` (already stripped of its leading `/`) either on disk
/// (`ui_dev`) or in the embedded asset table, falling back to
/// `index.html` for any path that doesn't resolve to a concrete file —
/// the usual single-page-app routing convention.
pub fn lookup(path: &str, ui_dev: bool) -> Option<Vec<u8>> {
    if ui_dev {
        let candidate = std::path::Path::new(UI_DEV_DIR).join(path);
        if let Ok(bytes) = std::fs::read(&candidate) {
            return Some(bytes);
        }
        return std::fs::read(std::path::Path::new(UI_DEV_DIR).join("index.html")).ok();
    }
    if let Some(file) = Assets::get(path) {
        return Some(file.data.into_owned());
    }
    Assets::get("index.html").map(|file| file.data.into_owned())
}

#[cfg(test)]
#[path = "ui_tests.rs"]
mod tests;
