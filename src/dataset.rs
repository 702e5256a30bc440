use crate::config::BankConfig;
use crate::unit::CapacitorUnit;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Reads a prepared dataset, one unit per CSV row.
pub fn load_units(path: &Path) -> Result<Vec<CapacitorUnit>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open dataset: {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut units = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let unit: CapacitorUnit =
            row.with_context(|| format!("failed to parse dataset row {}", i + 1))?;
        units.push(unit);
    }
    Ok(units)
}

/// Writes units with their current placements, same columns as the input.
pub fn write_units(path: &Path, units: &[CapacitorUnit]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create dataset: {}", path.display()))?;
    for unit in units {
        writer.serialize(unit)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the JSON configuration and checks its values.
pub fn load_config(path: &Path) -> Result<BankConfig> {
    let file = File::open(path)
        .with_context(|| format!("failed to open configuration: {}", path.display()))?;
    let config: BankConfig = serde_json::from_reader(file)
        .with_context(|| format!("failed to parse configuration: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{run_balance, OptimizeOpt};
    use crate::topology::{BranchId, LegId};
    use crate::unit::Conformity;
    use anyhow::format_err;
    use std::env;

    fn testdata(name: &str) -> Result<std::path::PathBuf> {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR")?;
        Ok(Path::new(&manifest_dir).join("testdata").join(name))
    }

    #[test]
    fn test_load_sample_dataset() -> Result<()> {
        let units = load_units(&testdata("fase_a.csv")?)?;
        assert_eq!(units.len(), 32);

        let u = &units[0];
        assert_eq!(u.branch, BranchId::A1);
        assert_eq!(u.leg, LegId::P1);
        assert_eq!(u.position, 1);
        assert_eq!(u.conformity, Some(Conformity::Conforming));
        assert!(u.serial.is_some());
        assert!(u.temperature_c.is_some());
        Ok(())
    }

    #[test]
    fn test_load_minimal_columns() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("min.csv");
        std::fs::write(
            &path,
            "rack,ramo,perna,posicao,capacitancia_campo_ajustada_uF\nR2,B3,P4,17,401.25\n",
        )?;

        let units = load_units(&path)?;
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].branch, BranchId::B3);
        assert_eq!(units[0].adjusted_capacitance_uf, 401.25);
        assert_eq!(units[0].serial, None);
        assert_eq!(units[0].conformity, None);
        Ok(())
    }

    #[test]
    fn test_write_then_load() -> Result<()> {
        let units = load_units(&testdata("fase_a.csv")?)?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.csv");

        write_units(&path, &units)?;
        let reloaded = load_units(&path)?;
        if reloaded != units {
            return Err(format_err!("dataset changed when written and read back"));
        }
        Ok(())
    }

    #[test]
    fn test_balance_sample_dataset() -> Result<()> {
        let config = load_config(&testdata("config.json")?)?;
        let units = load_units(&testdata("fase_a.csv")?)?;
        let opt = OptimizeOpt::new("R1", 10)?;

        let (results, updated) = run_balance(units.clone(), &config, &opt, None)?;
        assert!(results.swap_count() >= 1);
        assert!(results.unbalance_current_a() < results.initial_unbalance_current_a);

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("updated.csv");
        write_units(&path, &updated)?;
        let reloaded = load_units(&path)?;
        assert_eq!(reloaded.len(), units.len());

        // same units, some of them in new slots
        let moved = units
            .iter()
            .zip(reloaded.iter())
            .filter(|(a, b)| a.position != b.position)
            .count();
        assert_eq!(moved, 2 * results.swap_count());
        for (a, b) in units.iter().zip(reloaded.iter()) {
            assert_eq!(a.serial, b.serial);
            assert_eq!(a.adjusted_capacitance_uf, b.adjusted_capacitance_uf);
        }
        Ok(())
    }

    #[test]
    fn test_load_sample_config() -> Result<()> {
        let config = load_config(&testdata("config.json")?)?;
        assert_eq!(config.constants.frequency_hz, 60.0);
        assert_eq!(config.constraints.tolerance_a, 0.01);
        Ok(())
    }
}
