//! Serde model of an Overpass `out body geom` response.

use serde::Deserialize;

/// Top-level response. Elements stay untyped until [`OverpassElement`]
/// parsing so one malformed element cannot sink the rest.
#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Relation(OverpassRelation),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct OverpassRelation {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub tags: RelationTags,
    /// Decoded one at a time by [`OverpassRelation::way_members`] so a bad
    /// member only costs its own geometry.
    #[serde(default)]
    pub members: Vec<serde_json::Value>,
}

impl OverpassRelation {
    /// Way members in relation order, and the number of members that failed to decode.
    pub fn way_members(&self) -> (Vec<WayMember>, usize) {
        let mut ways = Vec::new();
        let mut malformed = 0usize;
        for member in &self.members {
            match RelationMember::deserialize(member) {
                Ok(RelationMember::Way(way)) => ways.push(way),
                Ok(RelationMember::Other) => {}
                Err(_) => malformed += 1,
            }
        }
        (ways, malformed)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RelationTags {
    #[serde(rename = "ref")]
    pub line_ref: Option<String>,
    pub name: Option<String>,
    pub network: Option<String>,
    pub route: Option<String>,
}

/// Relation member. Node members (stops, platforms) carry no line geometry.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelationMember {
    Way(WayMember),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct WayMember {
    #[serde(rename = "ref", default)]
    pub way_id: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<GeometryPoint>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeometryPoint {
    pub lat: f64,
    pub lon: f64,
}
