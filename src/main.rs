mod app;

use clap::Parser;
use eframe::egui;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use app::HeatmapApp;
use clustermap_viewer::config::ViewerConfig;
use clustermap_viewer::error::ConfigError;
use clustermap_viewer::fetch::DataSource;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const APP_NAME: &str = "Clustered Expression Heatmap";

#[derive(Debug, Parser)]
#[command(name = "clustermap_viewer")]
#[command(about = "Interactive heatmap of a hierarchically clustered expression matrix.", long_about = None)]
struct Args {
    /// Clustering endpoint to fetch from.
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Read the clustering payload from this JSON FILE instead of the endpoint.
    #[arg(long, value_name = "FILE", conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Number of most variable genes the service should keep.
    #[arg(long, value_name = "N")]
    top_n_genes: Option<usize>,

    /// Viewer settings (color domain, margins, zoom limits) as JSON.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> Result<ViewerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };
        if let Some(url) = &self.url {
            config.source_url = url.clone();
        }
        if self.top_n_genes.is_some() {
            config.top_n_genes = self.top_n_genes;
        }
        Ok(config)
    }

    fn source(&self, config: &ViewerConfig) -> DataSource {
        match &self.file {
            Some(path) => DataSource::File(path.clone()),
            None => DataSource::Url {
                url: config.source_url.clone(),
                top_n_genes: config.top_n_genes,
            },
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = args.load_config()?;
    let source = args.source(&config);
    tracing::debug!(?config, "viewer configuration");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title(APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(HeatmapApp::new(cc, config, source)))),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fetch_from_endpoint() {
        let args = Args::try_parse_from(["clustermap_viewer"]).unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(
            args.source(&config),
            DataSource::Url {
                url: clustermap_viewer::config::DEFAULT_SOURCE_URL.to_string(),
                top_n_genes: Some(clustermap_viewer::config::DEFAULT_TOP_N_GENES),
            }
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "clustermap_viewer",
            "--url",
            "http://lab-server:8080/api/clustering",
            "--top-n-genes",
            "50",
        ])
        .unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(config.source_url, "http://lab-server:8080/api/clustering");
        assert_eq!(config.top_n_genes, Some(50));
    }

    #[test]
    fn test_file_source() {
        let args = Args::try_parse_from(["clustermap_viewer", "--file", "result.json"]).unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(
            args.source(&config),
            DataSource::File(PathBuf::from("result.json"))
        );
    }

    #[test]
    fn test_url_and_file_conflict() {
        let parsed = Args::try_parse_from([
            "clustermap_viewer",
            "--url",
            "http://localhost/api",
            "--file",
            "result.json",
        ]);
        assert!(parsed.is_err());
    }
}
