use super::ids::{PoreId, ThroatId};
use super::pore::{Pore, Throat};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Duplicate pore id {0}")]
    DuplicatePore(PoreId),
    #[error("Duplicate throat id {0}")]
    DuplicateThroat(ThroatId),
    #[error("Throat {throat} references unknown pore {pore}")]
    DanglingThroat { throat: ThroatId, pore: PoreId },
    #[error("Porosity must lie in [0, 1], got {0}")]
    InvalidPorosity(f64),
    #[error("Tortuosity must be >= 1, got {0}")]
    InvalidTortuosity(f64),
    #[error("Pixel size must be positive and finite, got {0}")]
    InvalidPixelSize(f64),
}

/// The pore-throat graph a permeability simulation operates on.
///
/// The model is created once by the upstream network-generation stage (or loaded from
/// disk) and is treated as immutable input by every solver. Construction goes through
/// [`PoreNetworkModelBuilder`], which enforces unique ids, the referential invariant on
/// throats and recomputes every derived quantity (connection counts, total volumes).
#[derive(Debug, Clone, PartialEq)]
pub struct PoreNetworkModel {
    pores: Vec<Pore>,
    throats: Vec<Throat>,
    pore_index: HashMap<PoreId, usize>,
    pixel_size: f64,
    porosity: f64,
    tortuosity: f64,
    total_pore_volume: f64,
    total_throat_volume: f64,
}

impl PoreNetworkModel {
    pub fn pores(&self) -> &[Pore] {
        &self.pores
    }

    pub fn throats(&self) -> &[Throat] {
        &self.throats
    }

    pub fn pore(&self, id: PoreId) -> Option<&Pore> {
        self.pore_index.get(&id).map(|&idx| &self.pores[idx])
    }

    /// Position of the pore in [`Self::pores`], used by solvers to index dense vectors.
    pub fn pore_position(&self, id: PoreId) -> Option<usize> {
        self.pore_index.get(&id).copied()
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    pub fn tortuosity(&self) -> f64 {
        self.tortuosity
    }

    pub fn total_pore_volume(&self) -> f64 {
        self.total_pore_volume
    }

    pub fn total_throat_volume(&self) -> f64 {
        self.total_throat_volume
    }

    pub fn is_empty(&self) -> bool {
        self.pores.is_empty()
    }

    /// Re-checks the scalar invariants of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_scalars(self.pixel_size, self.porosity, self.tortuosity)
    }
}

fn validate_scalars(pixel_size: f64, porosity: f64, tortuosity: f64) -> Result<(), ModelError> {
    if !(pixel_size.is_finite() && pixel_size > 0.0) {
        return Err(ModelError::InvalidPixelSize(pixel_size));
    }
    if !(0.0..=1.0).contains(&porosity) {
        return Err(ModelError::InvalidPorosity(porosity));
    }
    if !(tortuosity.is_finite() && tortuosity >= 1.0) {
        return Err(ModelError::InvalidTortuosity(tortuosity));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PoreNetworkModelBuilder {
    pores: Vec<Pore>,
    throats: Vec<Throat>,
    pore_index: HashMap<PoreId, usize>,
    throat_ids: HashSet<ThroatId>,
    pixel_size: f64,
    porosity: f64,
    tortuosity: f64,
}

impl Default for PoreNetworkModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoreNetworkModelBuilder {
    pub fn new() -> Self {
        Self {
            pores: Vec::new(),
            throats: Vec::new(),
            pore_index: HashMap::new(),
            throat_ids: HashSet::new(),
            pixel_size: 1.0,
            porosity: 0.0,
            tortuosity: 1.0,
        }
    }

    pub fn pixel_size(&mut self, pixel_size: f64) -> &mut Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn porosity(&mut self, porosity: f64) -> &mut Self {
        self.porosity = porosity;
        self
    }

    pub fn tortuosity(&mut self, tortuosity: f64) -> &mut Self {
        self.tortuosity = tortuosity;
        self
    }

    pub fn has_pore(&self, id: PoreId) -> bool {
        self.pore_index.contains_key(&id)
    }

    pub fn pore_count(&self) -> usize {
        self.pores.len()
    }

    pub fn throat_count(&self) -> usize {
        self.throats.len()
    }

    pub fn add_pore(&mut self, pore: Pore) -> Result<&mut Self, ModelError> {
        if self.pore_index.contains_key(&pore.id) {
            return Err(ModelError::DuplicatePore(pore.id));
        }
        self.pore_index.insert(pore.id, self.pores.len());
        self.pores.push(pore);
        Ok(self)
    }

    pub fn add_throat(&mut self, throat: Throat) -> Result<&mut Self, ModelError> {
        for pore in [throat.pore1, throat.pore2] {
            if !self.pore_index.contains_key(&pore) {
                return Err(ModelError::DanglingThroat {
                    throat: throat.id,
                    pore,
                });
            }
        }
        if !self.throat_ids.insert(throat.id) {
            return Err(ModelError::DuplicateThroat(throat.id));
        }
        self.throats.push(throat);
        Ok(self)
    }

    pub fn build(self) -> Result<PoreNetworkModel, ModelError> {
        validate_scalars(self.pixel_size, self.porosity, self.tortuosity)?;

        let mut pores = self.pores;
        let mut counts = vec![0i32; pores.len()];
        for throat in &self.throats {
            counts[self.pore_index[&throat.pore1]] += 1;
            if throat.pore2 != throat.pore1 {
                counts[self.pore_index[&throat.pore2]] += 1;
            }
        }
        for (pore, count) in pores.iter_mut().zip(counts) {
            pore.set_connection_count(count);
        }

        let total_pore_volume = pores.iter().map(|p| p.volume).sum();
        let total_throat_volume = self.throats.iter().map(|t| t.volume).sum();

        Ok(PoreNetworkModel {
            pores,
            throats: self.throats,
            pore_index: self.pore_index,
            pixel_size: self.pixel_size,
            porosity: self.porosity,
            tortuosity: self.tortuosity,
            total_pore_volume,
            total_throat_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn pore(id: i32, x: f64) -> Pore {
        Pore::new(PoreId(id), Point3::new(x, 0.0, 0.0), 1.0, 2.0, 3.0)
    }

    fn throat(id: i32, a: i32, b: i32) -> Throat {
        Throat::new(ThroatId(id), PoreId(a), PoreId(b), 0.5, 1.0, 0.25)
    }

    fn build_chain() -> PoreNetworkModel {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.porosity(0.2).tortuosity(1.5);
        for i in 0..3 {
            builder.add_pore(pore(i, i as f64)).unwrap();
        }
        builder.add_throat(throat(10, 0, 1)).unwrap();
        builder.add_throat(throat(11, 1, 2)).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn build_recomputes_connection_counts() {
        let model = build_chain();
        let counts: Vec<i32> = model.pores().iter().map(|p| p.connection_count()).collect();
        assert_eq!(counts, vec![1, 2, 1]);
    }

    #[test]
    fn build_recomputes_total_volumes() {
        let model = build_chain();
        assert_eq!(model.total_pore_volume(), 6.0);
        assert_eq!(model.total_throat_volume(), 0.5);
    }

    #[test]
    fn pore_lookup_uses_id_not_position() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.add_pore(pore(42, 0.0)).unwrap();
        builder.add_pore(pore(7, 1.0)).unwrap();
        let model = builder.build().unwrap();
        assert_eq!(model.pore(PoreId(7)).unwrap().center.x, 1.0);
        assert_eq!(model.pore_position(PoreId(42)), Some(0));
        assert!(model.pore(PoreId(1)).is_none());
    }

    #[test]
    fn duplicate_pore_is_rejected() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.add_pore(pore(1, 0.0)).unwrap();
        let err = builder.add_pore(pore(1, 1.0)).unwrap_err();
        assert_eq!(err, ModelError::DuplicatePore(PoreId(1)));
    }

    #[test]
    fn duplicate_throat_is_rejected() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.add_pore(pore(0, 0.0)).unwrap();
        builder.add_pore(pore(1, 1.0)).unwrap();
        builder.add_throat(throat(5, 0, 1)).unwrap();
        let err = builder.add_throat(throat(5, 1, 0)).unwrap_err();
        assert_eq!(err, ModelError::DuplicateThroat(ThroatId(5)));
    }

    #[test]
    fn throat_referencing_missing_pore_is_rejected() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.add_pore(pore(0, 0.0)).unwrap();
        let err = builder.add_throat(throat(1, 0, 9)).unwrap_err();
        assert_eq!(
            err,
            ModelError::DanglingThroat {
                throat: ThroatId(1),
                pore: PoreId(9)
            }
        );
    }

    #[test]
    fn build_rejects_out_of_range_scalars() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.porosity(1.5);
        assert_eq!(builder.build().unwrap_err(), ModelError::InvalidPorosity(1.5));

        let mut builder = PoreNetworkModelBuilder::new();
        builder.tortuosity(0.9);
        assert_eq!(
            builder.build().unwrap_err(),
            ModelError::InvalidTortuosity(0.9)
        );

        let mut builder = PoreNetworkModelBuilder::new();
        builder.pixel_size(0.0);
        assert_eq!(
            builder.build().unwrap_err(),
            ModelError::InvalidPixelSize(0.0)
        );
    }
}
