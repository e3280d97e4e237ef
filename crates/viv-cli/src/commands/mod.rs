pub mod simulate;
pub mod species;

use std::path::Path;

use viv_core::SpeciesTable;
use viv_simulation::SimConfig;

use crate::ecosystem;

/// Read a species table from `path`, or fall back to the built-in one.
fn load_species(path: Option<&Path>) -> Result<SpeciesTable, String> {
    let Some(path) = path else {
        return ecosystem::default_species().map_err(|e| e.to_string());
    };
    let text = read(path)?;
    SpeciesTable::from_json_str(&text)
        .map_err(|e| format!("invalid species table {}: {e}", path.display()))
}

/// Read a simulation config from `path`, or use the defaults.
fn load_config(path: Option<&Path>) -> Result<SimConfig, String> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = read(path)?;
    SimConfig::from_json_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}
