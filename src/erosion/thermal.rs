//! Thermal relaxation: material slides from slopes steeper than the angle of repose.

use super::config::ThermalConfig;
use crate::error::{Result, TerrainError};
use crate::terrain::Field;

const NEIGHBORS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Summary of a relaxation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalStats {
    pub iterations: u32,
    /// Total height moved between cells.
    pub material_moved: f64,
    /// Cells whose incoming material was scaled back to stay under the ceiling.
    pub transfers_capped: u64,
}

/// Relaxes slopes above the talus threshold by moving material downhill.
#[derive(Debug, Clone)]
pub struct ThermalRelaxer {
    config: ThermalConfig,
}

impl ThermalRelaxer {
    pub fn new(config: ThermalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    /// Relaxes with the current field maximum as the ceiling.
    pub fn relax(&self, field: &mut Field) -> ThermalStats {
        let ceiling = field.max_height();
        self.relax_with_ceiling(field, ceiling)
    }

    /// Relaxes without letting any receiving cell rise above `ceiling`.
    ///
    /// All transfers of an iteration are computed from the same heights and applied
    /// together. Material a receiver cannot take stays with the sender, so the total
    /// height is conserved.
    pub fn relax_with_ceiling(&self, field: &mut Field, ceiling: f32) -> ThermalStats {
        let (width, height) = (field.width(), field.height());
        let talus = self.config.talus_threshold();
        let rate = self.config.transfer_rate;
        let mut stats = ThermalStats::default();

        let mut transfers: Vec<(usize, usize, f32)> = Vec::new();
        let mut incoming = vec![0.0f32; field.len()];
        let mut scale = vec![1.0f32; field.len()];

        for _ in 0..self.config.iterations {
            transfers.clear();
            incoming.fill(0.0);

            for y in 0..height {
                for x in 0..width {
                    let h = field.get(x, y);
                    let from = field.index(x, y);

                    let mut lower = [(0usize, 0.0f32); 4];
                    let mut count = 0;
                    let mut max_drop = 0.0f32;
                    let mut total_excess = 0.0f32;
                    for (dx, dy) in NEIGHBORS {
                        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                        if !field.contains(nx, ny) {
                            continue;
                        }
                        let (nx, ny) = (nx as usize, ny as usize);
                        let drop = h - field.get(nx, ny);
                        if drop > talus {
                            lower[count] = (field.index(nx, ny), drop - talus);
                            count += 1;
                            max_drop = max_drop.max(drop);
                            total_excess += drop - talus;
                        }
                    }
                    if count == 0 || total_excess <= 0.0 {
                        continue;
                    }

                    let moved = rate * 0.5 * (max_drop - talus);
                    for &(to, excess) in &lower[..count] {
                        let amount = moved * excess / total_excess;
                        transfers.push((from, to, amount));
                        incoming[to] += amount;
                    }
                }
            }

            if transfers.is_empty() {
                stats.iterations += 1;
                break;
            }

            let data = field.data_mut();
            for (i, s) in scale.iter_mut().enumerate() {
                *s = if incoming[i] <= 0.0 {
                    1.0
                } else {
                    let room = (ceiling - data[i]).max(0.0);
                    if data[i] + incoming[i] > ceiling {
                        stats.transfers_capped += 1;
                        room / incoming[i]
                    } else {
                        1.0
                    }
                };
            }

            for &(from, to, amount) in &transfers {
                let applied = amount * scale[to];
                data[from] -= applied;
                data[to] += applied;
                stats.material_moved += applied as f64;
            }
            stats.iterations += 1;
        }

        debug_assert!(field.as_slice().iter().all(|h| h.is_finite()));
        tracing::debug!(
            iterations = stats.iterations,
            moved = stats.material_moved,
            capped = stats.transfers_capped,
            "thermal relaxation complete"
        );
        stats
    }
}

impl TryFrom<ThermalConfig> for ThermalRelaxer {
    type Error = TerrainError;

    fn try_from(config: ThermalConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::generators;

    fn relaxer(iterations: u32) -> ThermalRelaxer {
        ThermalRelaxer::new(ThermalConfig {
            talus_angle: 0.5,
            transfer_rate: 0.5,
            iterations,
            cell_size: 1.0,
        })
        .unwrap()
    }

    #[test]
    fn test_flat_field_unchanged() {
        let mut field = Field::filled(8, 8, 3.0).unwrap();
        let stats = relaxer(10).relax(&mut field);
        assert_eq!(field, Field::filled(8, 8, 3.0).unwrap());
        assert_eq!(stats.material_moved, 0.0);
        assert_eq!(stats.iterations, 1, "stops once nothing moves");
    }

    #[test]
    fn test_spike_spreads_and_conserves_mass() {
        let mut field = Field::filled(7, 7, 0.0).unwrap();
        field.add(3, 3, 20.0);
        let before = field.sum();

        let stats = relaxer(50).relax(&mut field);

        assert!(field.get(3, 3) < 20.0);
        assert!(field.get(2, 3) > 0.0);
        assert!(stats.material_moved > 0.0);
        assert!((field.sum() - before).abs() < 1e-3);
        assert!(field.max_height() <= 20.0);
    }

    #[test]
    fn test_slopes_end_near_talus() {
        let mut field = generators::cone(24, 24, 12.0, 12.0, 6.0, 30.0).unwrap();
        let config = ThermalConfig { talus_angle: 0.6, transfer_rate: 0.5, iterations: 2000, cell_size: 1.0 };
        let talus = config.talus_threshold();
        ThermalRelaxer::new(config).unwrap().relax(&mut field);

        let mut steepest = 0.0f32;
        for y in 0..24 {
            for x in 0..23 {
                steepest = steepest.max((field.get(x, y) - field.get(x + 1, y)).abs());
            }
        }
        assert!(steepest < talus * 2.0, "steepest={steepest} talus={talus}");
    }

    #[test]
    fn test_ceiling_holds_receivers() {
        // A pit between two tall columns: both would pour into it.
        let mut field = Field::from_vec(3, 1, vec![10.0, 0.0, 10.0]).unwrap();
        let before = field.sum();
        let stats = relaxer(1).relax_with_ceiling(&mut field, 3.0);
        assert!(field.get(1, 0) <= 3.0 + 1e-5);
        assert!(stats.transfers_capped >= 1);
        assert!((field.sum() - before).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = ThermalConfig { transfer_rate: -0.1, ..Default::default() };
        assert!(ThermalRelaxer::new(config.clone()).is_err());
        assert!(ThermalRelaxer::try_from(config).is_err());
    }
}
