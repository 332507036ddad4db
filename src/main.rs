use arm_viewer::ViewerConfig;

/// `arm-viewer [MODEL...]`
///
/// Without arguments the robot arm parts below `assets/models` are shown.
/// Otherwise every argument is a model path relative to the asset root.
fn main() -> anyhow::Result<()> {
    let models: Vec<String> = std::env::args().skip(1).collect();
    let mut config = ViewerConfig::default();
    if !models.is_empty() {
        config = config.with_models(models);
    }
    if let Ok(root) = std::env::var("ARM_VIEWER_ASSETS") {
        config = config.with_asset_root(root);
    }
    arm_viewer::run(config)
}
