use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formats::{DatasetKind, FeatureCollection};
use foundation::{CountryCode, GeoPoint};
use layers::{ADM2_ID_PROPERTY, CaseType, LayerId, RecordingSurface, SourceId};
use streaming::{DatasetSource, FilesystemSource, HttpSource};
use sync::{CaseCounts, FeatureDetails, MapSession, SyncConfig, submit_and_load};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect per-country ADM2 / impact-region datasets")]
struct Args {
    /// JSON config file (every key optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset base URL (overrides config and ADM2_DATA_BASE)
    #[arg(long)]
    base_url: Option<String>,

    /// Read datasets from a local directory instead of over HTTP
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a country the way the map does and print the legend
    Show {
        #[arg(long)]
        country: CountryCode,

        #[arg(long)]
        hide_adm2: bool,

        #[arg(long)]
        hide_ir: bool,

        /// Case label to filter out (any alias); repeatable
        #[arg(long = "disable")]
        disabled: Vec<String>,

        /// adm2_id to select and show in the inspector
        #[arg(long)]
        select: Option<String>,
    },

    /// Fetch a single dataset and summarize it
    Inspect {
        #[arg(long)]
        country: CountryCode,

        /// adm2, ir or ir_problematic
        #[arg(long, default_value = "adm2")]
        kind: DatasetKind,
    },

    /// Print where each dataset of a country is read from
    Urls {
        #[arg(long)]
        country: CountryCode,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SyncConfig::from_json_file(path)?,
        None => SyncConfig::default(),
    }
    .with_env_overrides();
    if let Some(base) = args.base_url {
        config.base_url = base;
    }

    let source: Box<dyn DatasetSource> = match &args.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "reading datasets from disk");
            Box::new(FilesystemSource::new(dir))
        }
        None => {
            info!(base = %config.base_url, "reading datasets over HTTP");
            Box::new(HttpSource::new(config.base_url.clone()))
        }
    };

    match args.command {
        Command::Show {
            country,
            hide_adm2,
            hide_ir,
            disabled,
            select,
        } => {
            show(
                config,
                source.as_ref(),
                country,
                ShowOptions {
                    hide_adm2,
                    hide_ir,
                    disabled,
                    select,
                },
            )
            .await
        }
        Command::Inspect { country, kind } => inspect(source.as_ref(), &country, kind).await,
        Command::Urls { country } => {
            for kind in DatasetKind::ALL {
                println!("{:<15} {}", kind.suffix(), source.location(&country, kind));
            }
            Ok(())
        }
    }
}

struct ShowOptions {
    hide_adm2: bool,
    hide_ir: bool,
    disabled: Vec<String>,
    select: Option<String>,
}

async fn show(
    config: SyncConfig,
    source: &dyn DatasetSource,
    country: CountryCode,
    opts: ShowOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let surface = RecordingSurface::with_style_layers(config.hide_basemap_layers.clone());
    let mut session = MapSession::new(surface, config);
    session.pump();

    session.set_pending(country.clone());
    let outcomes = submit_and_load(&mut session, source).await;
    for outcome in &outcomes {
        info!(outcome = ?outcome, "dataset");
    }

    if opts.hide_adm2 {
        session.toggle_adm2();
    }
    if opts.hide_ir {
        session.toggle_ir();
    }
    for label in &opts.disabled {
        match session.toggle_case_label(label) {
            Some(_) => {}
            None => warn!(label = %label, "unknown case label ignored"),
        }
    }

    println!("Country: {country}");
    if let Some(err) = session.store().error() {
        println!("Error: {err}");
    }
    if let Some(anchor) = session.engine().anchor() {
        println!(
            "Camera: lon {:.4} lat {:.4} zoom {}",
            anchor.center.lon_deg, anchor.center.lat_deg, anchor.zoom
        );
    }
    for id in SourceId::ALL {
        println!("{:<15} {:?}", id.as_str(), session.engine().presence(id));
    }
    if let Some(filter) = session.surface().filter(LayerId::Adm2Fill.as_str()) {
        println!("ADM2 filter: {}", filter.to_expression());
    }
    println!();
    print!("{}", session.legend());

    if let Some(adm2_id) = &opts.select {
        select_feature(&mut session, adm2_id);
        match session.selected_details() {
            Some(details) => print_details(&details),
            None => println!("\n{adm2_id}: not rendered with the current filters"),
        }
    }
    Ok(())
}

/// Clicks the rendered feature carrying `adm2_id`.
fn select_feature(session: &mut MapSession<RecordingSurface>, adm2_id: &str) {
    let found = session
        .surface()
        .source_data(SourceId::Adm2.as_str())
        .and_then(|data| {
            data.features
                .iter()
                .find(|f| f.property_str(ADM2_ID_PROPERTY).as_deref() == Some(adm2_id))
                .map(|f| f.properties.clone())
        });
    let Some(properties) = found else {
        warn!(adm2_id, "no such ADM2 feature");
        return;
    };
    let at = session
        .engine()
        .anchor()
        .map(|a| a.center)
        .unwrap_or(GeoPoint::new(0.0, 0.0));
    session
        .surface_mut()
        .click(LayerId::Adm2Fill.as_str(), properties, at);
    session.pump();
}

fn print_details(details: &FeatureDetails) {
    println!();
    for (label, value) in details.rows() {
        println!("{label:<5} {value}");
    }
    println!("Color {}", details.color);
}

async fn inspect(
    source: &dyn DatasetSource,
    country: &CountryCode,
    kind: DatasetKind,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", source.location(country, kind));
    let collection = source.fetch(country, kind).await?;
    summarize(&collection, kind);
    Ok(())
}

fn summarize(collection: &FeatureCollection, kind: DatasetKind) {
    println!("{} features", collection.len());
    if let Some(c) = collection.centroid() {
        println!("centroid: {:.4}, {:.4}", c.lon_deg, c.lat_deg);
    }
    if let Some(b) = collection.bounds() {
        println!(
            "bounds:   {:.4}, {:.4} .. {:.4}, {:.4}",
            b.min.lon_deg, b.min.lat_deg, b.max.lon_deg, b.max.lat_deg
        );
    }
    if kind == DatasetKind::Adm2 {
        let counts = CaseCounts::from_collection(collection);
        for case in CaseType::ALL {
            println!("{:<8} {:>6}", case.label(), counts.get(case));
        }
        if counts.unclassified() > 0 {
            println!("unclassified {}", counts.unclassified());
        }
    }
}
