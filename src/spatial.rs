//! Spatial lookup of city markers.
//!
//! Used to resolve a click or hover position on the map to the city marker
//! under it.

use std::fmt;

use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};

use crate::aggregation::CityAggregate;
use crate::Coordinate;

/// R-tree entry: `[lng, lat]` with the city's index in its session.
type CityPoint = GeomWithData<[f64; 2], usize>;

/// R-tree over the cities of one session.
#[derive(Default)]
pub struct CityIndex {
    tree: RTree<CityPoint>,
}

impl fmt::Debug for CityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CityIndex").field("size", &self.tree.size()).finish()
    }
}

impl CityIndex {
    /// Index cities by position. Entry data is the index in `cities`.
    pub fn build(cities: &[CityAggregate]) -> Self {
        let points: Vec<CityPoint> = cities
            .iter()
            .enumerate()
            .map(|(i, c)| GeomWithData::new([c.coordinate.longitude, c.coordinate.latitude], i))
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Index of the nearest city within `radius_degrees` of `at`.
    pub fn nearest(&self, at: Coordinate, radius_degrees: f64) -> Option<usize> {
        let query = [at.longitude, at.latitude];
        let nearest = self.tree.nearest_neighbor(&query)?;
        if nearest.distance_2(&query) <= radius_degrees * radius_degrees {
            Some(nearest.data)
        } else {
            None
        }
    }

    /// Number of indexed cities.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True if no city is indexed.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(lat: f64, lon: f64) -> CityAggregate {
        CityAggregate {
            coordinate: Coordinate::new(lat, lon),
            description: String::new(),
            alternate_descriptions: Vec::new(),
            occurrences: Vec::new(),
        }
    }

    #[test]
    fn test_nearest_within_radius() {
        let index = CityIndex::build(&[city(10.0, 20.0), city(30.0, 40.0)]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.nearest(Coordinate::new(30.1, 40.1), 0.5), Some(1));
        assert_eq!(index.nearest(Coordinate::new(0.0, 0.0), 0.5), None);
    }

    #[test]
    fn test_empty_index() {
        let index = CityIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.nearest(Coordinate::new(0.0, 0.0), 10.0), None);
    }
}
