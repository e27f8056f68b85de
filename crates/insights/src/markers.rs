use crate::status::{StatusSeverity, classify_status};
use registry::{Case, CaseCategory};
use serde::{Deserialize, Serialize};

/// Longitude/latitude window covered by the North America map.
pub const LON_RANGE: (f64, f64) = (-170.0, -50.0);
pub const LAT_RANGE: (f64, f64) = (15.0, 75.0);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub case_id: String,
    pub label: String,
    pub vendor: String,
    #[serde(rename = "type")]
    pub category: CaseCategory,
    pub city: String,
    pub state: String,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
    pub status: String,
    pub severity: StatusSeverity,
    pub notes: Option<String>,
}

/// Markers for cases with a finite location inside the map window.
pub fn map_markers(cases: &[Case]) -> Vec<MapMarker> {
    cases
        .iter()
        .filter_map(|case| {
            let location = case.location.as_ref()?;
            let lon = location.lon.filter(|v| v.is_finite())?;
            let lat = location.lat.filter(|v| v.is_finite())?;

            let in_window = (LON_RANGE.0..=LON_RANGE.1).contains(&lon)
                && (LAT_RANGE.0..=LAT_RANGE.1).contains(&lat);
            if !in_window {
                return None;
            }

            Some(MapMarker {
                case_id: case.id.clone(),
                label: case.label.clone(),
                vendor: case.vendor.clone(),
                category: case.category,
                city: location.city.clone(),
                state: location.state.clone(),
                coordinates: [lon, lat],
                status: case.status().unwrap_or("Unknown").to_string(),
                severity: classify_status(case.status()),
                notes: case.notes().map(str::to_string),
            })
        })
        .collect()
}
