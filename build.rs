fn main() {
    // `calculate` is the only command the webview may invoke.
    tauri_build::try_build(
        tauri_build::Attributes::new()
            .app_manifest(tauri_build::AppManifest::new().commands(&["calculate"])),
    )
    .expect("failed to run tauri-build");
}
