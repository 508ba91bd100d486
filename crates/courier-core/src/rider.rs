use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub id: u32,
    pub name: String,
    pub phone: String,
    pub rating: f32,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Rider {
    pub fn new(id: u32, name: impl Into<String>, phone: impl Into<String>, rating: f32) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
            rating,
            available: true,
        }
    }
}

/// Seed riders used when the config does not list any.
pub fn default_riders() -> Vec<Rider> {
    vec![
        Rider::new(1, "John Smith", "(212) 555-1234", 4.8),
        Rider::new(2, "Jane Doe", "(646) 555-5678", 4.9),
        Rider::new(3, "Mike Johnson", "(917) 555-9012", 4.7),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_riders_start_available() {
        let riders = default_riders();
        assert_eq!(riders.len(), 3);
        assert!(riders.iter().all(|r| r.available));
    }

    #[test]
    fn availability_defaults_to_true_when_omitted() {
        let r: Rider =
            serde_json::from_str(r#"{"id":9,"name":"Ana","phone":"1","rating":5.0}"#).unwrap();
        assert!(r.available);
    }
}
