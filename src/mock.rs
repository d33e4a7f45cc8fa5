//! Built-in data sets: the incident list shown when no data file is given,
//! plus personnel and equipment rosters.

use chrono::NaiveDateTime;

use crate::format::truncate_text;
use crate::loader::{Dataset, parse_datetime};
use crate::table::{ColumnSpec, Record, Value};

struct Incident {
    id: &'static str,
    kind: &'static str,
    location: &'static str,
    severity: &'static str,
    status: &'static str,
    reported_at: &'static str,
    responders: u32,
    description: &'static str,
    lat: f64,
    lng: f64,
}

const INCIDENTS: [Incident; 8] = [
    Incident {
        id: "INC-001",
        kind: "Structure Fire",
        location: "123 Main Street, Downtown",
        severity: "High",
        status: "Active",
        reported_at: "2024-01-15 14:30",
        responders: 8,
        description: "Large structure fire with multiple units responding. Evacuation in progress.",
        lat: 40.7589,
        lng: -73.9851,
    },
    Incident {
        id: "INC-002",
        kind: "Medical Emergency",
        location: "Central Park, East Side",
        severity: "Medium",
        status: "En Route",
        reported_at: "2024-01-15 14:25",
        responders: 3,
        description: "Cardiac arrest reported. ALS unit dispatched.",
        lat: 40.7614,
        lng: -73.9776,
    },
    Incident {
        id: "INC-003",
        kind: "Traffic Accident",
        location: "Highway 101 & 5th Avenue",
        severity: "Low",
        status: "Resolved",
        reported_at: "2024-01-15 14:18",
        responders: 4,
        description: "Minor vehicle collision, no injuries reported. Traffic cleared.",
        lat: 40.7505,
        lng: -73.9934,
    },
    Incident {
        id: "INC-004",
        kind: "Flooding",
        location: "River District, Low Areas",
        severity: "High",
        status: "Active",
        reported_at: "2024-01-15 14:12",
        responders: 12,
        description: "Flash flooding due to storm water overflow. Multiple rescues in progress.",
        lat: 40.7282,
        lng: -74.0776,
    },
    Incident {
        id: "INC-005",
        kind: "Gas Leak",
        location: "47 Harbor Road, Waterfront",
        severity: "Medium",
        status: "Active",
        reported_at: "2024-01-15 13:58",
        responders: 5,
        description: "Natural gas odor reported. Utility crew on scene, block evacuated.",
        lat: 40.7033,
        lng: -74.0170,
    },
    Incident {
        id: "INC-006",
        kind: "Power Outage",
        location: "Midtown Substation",
        severity: "Medium",
        status: "Pending",
        reported_at: "2024-01-15 13:41",
        responders: 2,
        description: "Transformer failure affecting four blocks. Traffic signals dark.",
        lat: 40.7549,
        lng: -73.9840,
    },
    Incident {
        id: "INC-007",
        kind: "Medical Emergency",
        location: "Grand Central Terminal",
        severity: "Low",
        status: "Resolved",
        reported_at: "2024-01-15 13:20",
        responders: 2,
        description: "Fall with minor injuries. Patient treated on site.",
        lat: 40.7527,
        lng: -73.9772,
    },
    Incident {
        id: "INC-008",
        kind: "Hazmat Spill",
        location: "Industrial Park, Queens",
        severity: "High",
        status: "Cancelled",
        reported_at: "2024-01-15 12:55",
        responders: 0,
        description: "False alarm, container confirmed empty on arrival.",
        lat: 40.7420,
        lng: -73.9200,
    },
];

struct Responder {
    id: u32,
    name: &'static str,
    role: &'static str,
    unit: &'static str,
    status: &'static str,
    location: &'static str,
    contact: &'static str,
}

const PERSONNEL: [Responder; 3] = [
    Responder {
        id: 1,
        name: "Captain Sarah Johnson",
        role: "Fire Captain",
        unit: "Engine 12",
        status: "Available",
        location: "Station 12",
        contact: "(555) 123-4567",
    },
    Responder {
        id: 2,
        name: "Paramedic Mike Chen",
        role: "Paramedic",
        unit: "Ambulance 5",
        status: "On Call",
        location: "Downtown Hospital",
        contact: "(555) 234-5678",
    },
    Responder {
        id: 3,
        name: "Officer David Williams",
        role: "Police Officer",
        unit: "Patrol 23",
        status: "Deployed",
        location: "Highway 101",
        contact: "(555) 345-6789",
    },
];

struct Equipment {
    id: u32,
    name: &'static str,
    kind: &'static str,
    status: &'static str,
    location: &'static str,
    last_maintenance: &'static str,
}

const EQUIPMENT: [Equipment; 3] = [
    Equipment {
        id: 1,
        name: "Engine 12",
        kind: "Fire Engine",
        status: "Available",
        location: "Station 12",
        last_maintenance: "2024-01-10",
    },
    Equipment {
        id: 2,
        name: "Rescue 8",
        kind: "Rescue Vehicle",
        status: "In Use",
        location: "Main Street Fire",
        last_maintenance: "2024-01-08",
    },
    Equipment {
        id: 3,
        name: "Ambulance 5",
        kind: "Emergency Medical",
        status: "Available",
        location: "Hospital Station",
        last_maintenance: "2024-01-12",
    },
];

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: [&str; 3] = ["incidents", "personnel", "equipment"];

/// Built-in data set by name, ignoring case.
pub fn builtin(name: &str) -> Option<Dataset> {
    match name.to_lowercase().as_str() {
        "incidents" => Some(incidents()),
        "personnel" => Some(personnel()),
        "equipment" => Some(equipment()),
        _ => None,
    }
}

fn date_or_text(s: &str) -> Value {
    parse_datetime(s).map_or(Value::from(s), Value::Date)
}

/// Incident records and their columns.
pub fn incidents() -> Dataset {
    let records = INCIDENTS
        .iter()
        .map(|i| {
            Record::from([
                ("id".to_string(), Value::from(i.id)),
                ("type".to_string(), Value::from(i.kind)),
                ("location".to_string(), Value::from(i.location)),
                ("severity".to_string(), Value::from(i.severity)),
                ("status".to_string(), Value::from(i.status)),
                ("reported".to_string(), date_or_text(i.reported_at)),
                ("responders".to_string(), Value::from(i.responders)),
                ("description".to_string(), Value::from(i.description)),
                ("lat".to_string(), Value::from(i.lat)),
                ("lng".to_string(), Value::from(i.lng)),
            ])
        })
        .collect();

    let columns = vec![
        ColumnSpec::field("id", "ID").width(8),
        ColumnSpec::field("type", "Type").width(18),
        ColumnSpec::field("location", "Location").width(26),
        ColumnSpec::field("severity", "Severity").width(8),
        ColumnSpec::field("status", "Status").width(9),
        ColumnSpec::field("reported", "Reported")
            .width(16)
            .render_with(|value, _| match value {
                Value::Date(d) => d.format("%Y-%m-%d %H:%M").to_string(),
                other => other.to_display_string(),
            }),
        ColumnSpec::field("responders", "Units").width(5),
        ColumnSpec::field("description", "Description")
            .sortable(false)
            .render_with(|value, _| truncate_text(&value.to_display_string(), 60)),
        ColumnSpec::field("lat", "Lat").width(8).filterable(false),
        ColumnSpec::field("lng", "Lng").width(9).filterable(false),
    ];

    Dataset::new("incidents", records, columns)
}

/// Responders with their unit and how to reach them.
pub fn personnel() -> Dataset {
    let records = PERSONNEL
        .iter()
        .map(|p| {
            Record::from([
                ("id".to_string(), Value::from(p.id)),
                ("name".to_string(), Value::from(p.name)),
                ("role".to_string(), Value::from(p.role)),
                ("unit".to_string(), Value::from(p.unit)),
                ("status".to_string(), Value::from(p.status)),
                ("location".to_string(), Value::from(p.location)),
                ("contact".to_string(), Value::from(p.contact)),
            ])
        })
        .collect();

    let columns = vec![
        ColumnSpec::field("id", "ID").width(4),
        ColumnSpec::field("name", "Name").width(24),
        ColumnSpec::field("role", "Role").width(16),
        ColumnSpec::field("unit", "Unit").width(12),
        ColumnSpec::field("status", "Status").width(10),
        ColumnSpec::field("location", "Location").width(18),
        ColumnSpec::field("contact", "Contact")
            .width(15)
            .sortable(false),
    ];

    Dataset::new("personnel", records, columns)
}

/// Vehicles and their maintenance dates.
pub fn equipment() -> Dataset {
    let records = EQUIPMENT
        .iter()
        .map(|e| {
            Record::from([
                ("id".to_string(), Value::from(e.id)),
                ("name".to_string(), Value::from(e.name)),
                ("type".to_string(), Value::from(e.kind)),
                ("status".to_string(), Value::from(e.status)),
                ("location".to_string(), Value::from(e.location)),
                ("maintained".to_string(), date_or_text(e.last_maintenance)),
            ])
        })
        .collect();

    let columns = vec![
        ColumnSpec::field("id", "ID").width(4),
        ColumnSpec::field("name", "Name").width(12),
        ColumnSpec::field("type", "Type").width(18),
        ColumnSpec::field("status", "Status").width(10),
        ColumnSpec::field("location", "Location").width(18),
        ColumnSpec::field("maintained", "Last Maintenance").width(16),
    ];

    Dataset::new("equipment", records, columns)
}

/// Time the mock data set treats as "now", a few minutes after the last report.
pub fn reference_time() -> Option<NaiveDateTime> {
    parse_datetime("2024-01-15 14:32")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::is_valid_coordinate;

    #[test]
    fn every_incident_has_a_valid_position() {
        let data = incidents();
        assert_eq!(data.records.len(), INCIDENTS.len());
        for idx in 0..data.records.len() {
            let c = data.coordinates(idx).expect("coordinates");
            assert!(is_valid_coordinate(&c));
        }
    }

    #[test]
    fn reported_times_are_dates() {
        let data = incidents();
        assert!(
            data.records
                .iter()
                .all(|r| matches!(r.get("reported"), Some(Value::Date(_))))
        );
        assert!(reference_time().is_some());
    }

    #[test]
    fn builtin_sets_by_name() {
        for name in BUILTIN_NAMES {
            let data = builtin(name).expect("known name");
            assert_eq!(data.name, name);
            assert!(!data.records.is_empty());
        }
        assert_eq!(builtin("Personnel").map(|d| d.records.len()), Some(3));
        assert!(builtin("stations").is_none());
    }

    #[test]
    fn resources_have_no_position() {
        let data = equipment();
        assert!(data.coordinates(0).is_none());
        assert!(matches!(data.records[1]["maintained"], Value::Date(_)));
        assert_eq!(data.records[1]["status"], Value::from("In Use"));
        assert_eq!(personnel().column_index("Contact"), Some(6));
    }
}
