//! Pipeline orchestration: one run from configuration to written report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use matflow_classify::classify;
use matflow_classify::coefficient::CoefficientTable;
use matflow_classify::table::ClassificationTable;
use matflow_flow_models::{FlowRecord, Role};
use matflow_geography::index::AreaIndex;
use matflow_geography::load_areas;
use matflow_geography::postcode::PostcodeLookup;
use matflow_geography::resolve::{resolve_postcode, resolve_spatial};

use crate::ReportError;
use crate::config::RunConfig;
use crate::context::ReportContext;
use crate::indicators;
use crate::readers::{read_flow_records, read_trade_records};

/// Executes a full run: load, enrich, compute, write. Returns the path of
/// the written report.
///
/// # Errors
///
/// Returns [`ReportError`] when the configuration is broken, an input
/// cannot be read or the report cannot be written.
pub fn execute(config_path: &Path, output_dir: &Path) -> Result<PathBuf, ReportError> {
    let started = Instant::now();
    let config = RunConfig::load(config_path)?;
    config.validate()?;

    let mut records = read_flow_records(&config.inputs.flows)?;
    retain_year(&mut records, config.focus.year);
    let mut trade = match &config.inputs.trade {
        Some(path) => {
            let mut trade_records = read_trade_records(path)?;
            retain_year(&mut trade_records, config.focus.year);
            Some(trade_records)
        }
        None => None,
    };

    if let Some(path) = &config.inputs.areas_geojson {
        let index = AreaIndex::from_polygons(load_areas(path)?);
        for &role in Role::all() {
            resolve_spatial(&mut records, &index, role, config.areas_level());
            if let Some(trade_records) = trade.as_mut() {
                resolve_spatial(trade_records, &index, role, config.areas_level());
            }
        }
    }
    if let Some(path) = &config.inputs.postcodes {
        let lookup = PostcodeLookup::load(path)?;
        for &role in Role::all() {
            resolve_postcode(&mut records, &lookup, role);
            if let Some(trade_records) = trade.as_mut() {
                resolve_postcode(trade_records, &lookup, role);
            }
        }
    }

    let table = ClassificationTable::load(&config.inputs.classifications)?;
    for &scheme in table.schemes() {
        classify(&mut records, &table, scheme);
    }

    let coefficients = match &config.inputs.impact_coefficients {
        Some(path) => Some(CoefficientTable::load(path, config.impact_column())?),
        None => None,
    };

    let context = assemble(&config, &records, trade.as_deref(), coefficients.as_ref())?;
    let path = context.write_json(output_dir)?;
    log::info!(
        "Report run for {} {} finished in {:.1}s",
        config.focus.area,
        config.focus.year,
        started.elapsed().as_secs_f64()
    );
    Ok(path)
}

/// Computes every indicator the loaded inputs support and fills the
/// report in presentation order.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if an indicator payload does not
/// serialize.
pub fn assemble(
    config: &RunConfig,
    records: &[FlowRecord],
    trade: Option<&[FlowRecord]>,
    coefficients: Option<&CoefficientTable>,
) -> Result<ReportContext, ReportError> {
    let level = config.focus.level;
    let unit = config.focus.unit;
    let areas = &config.focus.areas;
    let mut context = ReportContext::new(config.focus.area.clone(), level, config.focus.year, unit);

    context.insert(
        "totalWaste",
        &indicators::total_waste(records, areas, level, unit),
    )?;
    context.insert(
        "treatmentMix",
        &indicators::treatment_mix(records, areas, level, unit),
    )?;
    context.insert(
        "recyclingShare",
        &indicators::recycling_share(records, areas, level, unit),
    )?;
    match coefficients {
        Some(table) => context.insert(
            "environmentalImpact",
            &indicators::environmental_impact(records, table, areas, level),
        )?,
        None => log::info!("No impact coefficients configured; skipping environmental impact"),
    }
    match trade {
        Some(trade_records) => context.insert(
            "materialInputConsumption",
            &indicators::material_input_consumption(trade_records, &config.focus.area, level, unit),
        )?,
        None => log::info!("No trade table configured; skipping material input/consumption"),
    }
    context.insert(
        "materialComposition",
        &indicators::material_composition(records, trade, unit),
    )?;
    Ok(context)
}

/// Loads and validates a configuration without running anything.
///
/// # Errors
///
/// Returns [`ReportError`] when the configuration does not parse or an
/// input file is missing.
pub fn check(config_path: &Path) -> Result<RunConfig, ReportError> {
    let config = RunConfig::load(config_path)?;
    config.validate()?;
    log::info!(
        "Configuration is complete; {} input files present",
        config.input_paths().len()
    );
    Ok(config)
}

fn retain_year(records: &mut Vec<FlowRecord>, year: u16) {
    let before = records.len();
    records.retain(|record| record.period.year == year);
    let dropped = before - records.len();
    if dropped > 0 {
        log::info!("Dropped {dropped} records outside reporting year {year}");
    }
}
