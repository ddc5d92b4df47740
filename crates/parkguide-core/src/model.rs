use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationType {
    ParkingSensor,
    Sensor,
    Unknown,
}

/// Source element kind of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationTag {
    Text,
    Rect,
    Circle,
    Ellipse,
}

impl StationTag {
    pub fn from_tag_name(tag: &str) -> Option<Self> {
        match tag {
            "text" => Some(Self::Text),
            "rect" => Some(Self::Rect),
            "circle" => Some(Self::Circle),
            "ellipse" => Some(Self::Ellipse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub tag: StationTag,
    #[serde(rename = "type")]
    pub kind: StationType,
    pub floor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: String,
    pub points: Vec<Coord>,
}

/// Snapshot of everything detected on one floor plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    pub floor: String,
    pub stations: Vec<Station>,
    pub lanes: Vec<Lane>,
    #[serde(rename = "viewBox", default, skip_serializing_if = "Option::is_none")]
    pub view_box: Option<String>,
}

impl ExtractResult {
    /// File name used when the snapshot is exported for download.
    pub fn export_file_name(&self) -> String {
        format!("garage-{}.json", self.floor)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialises_with_wire_names() {
        let result = ExtractResult {
            floor: "B1".to_string(),
            stations: vec![Station {
                id: "P12".to_string(),
                x: 1.5,
                y: 2.0,
                tag: StationTag::Text,
                kind: StationType::ParkingSensor,
                floor: "B1".to_string(),
            }],
            lanes: vec![Lane {
                id: "Lane_3".to_string(),
                points: vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 4.0, y: 0.0 }],
            }],
            view_box: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "floor": "B1",
                "stations": [
                    {"id": "P12", "x": 1.5, "y": 2.0, "tag": "text", "type": "ParkingSensor", "floor": "B1"}
                ],
                "lanes": [
                    {"id": "Lane_3", "points": [{"x": 0.0, "y": 0.0}, {"x": 4.0, "y": 0.0}]}
                ]
            })
        );
        assert_eq!(result.export_file_name(), "garage-B1.json");

        let with_box = ExtractResult {
            view_box: Some("0 0 10 10".to_string()),
            ..result
        };
        let text = with_box.to_json_pretty().unwrap();
        assert!(text.contains(r#""viewBox": "0 0 10 10""#));
    }
}
