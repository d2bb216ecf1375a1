//! Coordinate payloads of boundary features.
//!
//! Boundary files mix `Polygon` and `MultiPolygon` geometries and the odd bare
//! ring. [`Shape::from_json`] classifies a raw `coordinates` value by walking
//! down the first elements until it reaches a number, so nesting depth decides
//! the variant without recursion.

use serde::Deserialize;
use serde_json::Value;

/// `[longitude, latitude]`, GeoJSON axis order.
pub type Position = [f64; 2];

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Position),
    Ring(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Shape {
    /// Parse a raw `coordinates` payload. Returns `None` for empty or
    /// malformed payloads (mixed depths, non-numeric entries, positions with
    /// fewer than two numbers, nesting deeper than a multipolygon).
    pub fn from_json(coordinates: &Value) -> Option<Shape> {
        let mut depth = 0usize;
        let mut cursor = coordinates;
        loop {
            match cursor {
                Value::Array(items) => match items.first() {
                    Some(Value::Number(_)) => break,
                    Some(next) => {
                        depth += 1;
                        cursor = next;
                    }
                    None => return None,
                },
                _ => return None,
            }
        }

        match depth {
            0 => position(Vec::<f64>::deserialize(coordinates).ok()?).map(Shape::Point),
            1 => ring(Vec::<Vec<f64>>::deserialize(coordinates).ok()?).map(Shape::Ring),
            2 => Vec::<Vec<Vec<f64>>>::deserialize(coordinates)
                .ok()?
                .into_iter()
                .map(ring)
                .collect::<Option<Vec<_>>>()
                .map(Shape::Polygon),
            3 => Vec::<Vec<Vec<Vec<f64>>>>::deserialize(coordinates)
                .ok()?
                .into_iter()
                .map(|polygon| polygon.into_iter().map(ring).collect::<Option<Vec<_>>>())
                .collect::<Option<Vec<_>>>()
                .map(Shape::MultiPolygon),
            _ => None,
        }
    }

    /// Every vertex of the shape, in payload order.
    pub fn positions(&self) -> Box<dyn Iterator<Item = Position> + '_> {
        match self {
            Shape::Point(p) => Box::new(std::iter::once(*p)),
            Shape::Ring(r) => Box::new(r.iter().copied()),
            Shape::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
            Shape::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten().copied()),
        }
    }

    /// Closed rings to fill when drawing. A point has none.
    pub fn rings(&self) -> Vec<&[Position]> {
        match self {
            Shape::Point(_) => Vec::new(),
            Shape::Ring(r) => vec![r.as_slice()],
            Shape::Polygon(rings) => rings.iter().map(Vec::as_slice).collect(),
            Shape::MultiPolygon(polys) => polys.iter().flatten().map(Vec::as_slice).collect(),
        }
    }

    /// Approximate centroid as `[mean latitude, mean longitude]`.
    ///
    /// This is the arithmetic mean of the vertices, which is good enough to
    /// center a map on a municipality but is not the area-weighted centroid.
    /// Closing vertices that repeat the first one are counted like any other.
    pub fn vertex_centroid(&self) -> Option<[f64; 2]> {
        let (mut sum_lon, mut sum_lat, mut n) = (0.0, 0.0, 0usize);
        for [lon, lat] in self.positions() {
            sum_lon += lon;
            sum_lat += lat;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some([sum_lat / n as f64, sum_lon / n as f64])
    }

    /// Convert to a `geojson` value. A bare ring becomes a one-ring polygon.
    pub fn to_geojson(&self) -> geojson::Value {
        let pos = |p: &Position| vec![p[0], p[1]];
        let ring = |r: &Vec<Position>| r.iter().map(pos).collect::<Vec<_>>();
        match self {
            Shape::Point(p) => geojson::Value::Point(pos(p)),
            Shape::Ring(r) => geojson::Value::Polygon(vec![ring(r)]),
            Shape::Polygon(rings) => geojson::Value::Polygon(rings.iter().map(ring).collect()),
            Shape::MultiPolygon(polys) => geojson::Value::MultiPolygon(
                polys.iter().map(|p| p.iter().map(ring).collect()).collect(),
            ),
        }
    }
}

fn position(raw: Vec<f64>) -> Option<Position> {
    match raw.as_slice() {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some([*lon, *lat]),
        _ => None,
    }
}

fn ring(raw: Vec<Vec<f64>>) -> Option<Vec<Position>> {
    raw.into_iter().map(position).collect()
}

/// Bounding box `(min_lon, min_lat, max_lon, max_lat)` over a set of shapes.
pub fn bounds<'a>(shapes: impl IntoIterator<Item = &'a Shape>) -> Option<(f64, f64, f64, f64)> {
    let mut acc: Option<(f64, f64, f64, f64)> = None;
    for shape in shapes {
        for [lon, lat] in shape.positions() {
            acc = Some(match acc {
                None => (lon, lat, lon, lat),
                Some((a, b, c, d)) => (a.min(lon), b.min(lat), c.max(lon), d.max(lat)),
            });
        }
    }
    acc
}
