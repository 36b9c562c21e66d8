//! Patient domain model.

use serde::{Deserialize, Serialize};

/// A patient as stored in the pharmacy backend.
///
/// The selected patient context is authoritative for a conversation session;
/// one session exists per patient id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: String,
}

impl Patient {
    /// Convenience constructor for sessions created from an id and name only.
    pub fn new(patient_id: impl Into<String>, patient_name: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            patient_name: patient_name.into(),
            patient_email: String::new(),
            patient_phone: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_list_wire_shape() {
        let patients: Vec<Patient> = serde_json::from_str(
            r#"[{"patient_id": "P001", "patient_name": "Sarah Tan",
                 "patient_email": "sarah@example.com", "patient_phone": "+65 9000 0001"},
                {"patient_id": "P002", "patient_name": "Raj Patel"}]"#,
        )
        .unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].patient_email, "sarah@example.com");
        // Contact fields are optional on the wire.
        assert_eq!(patients[1].patient_phone, "");
    }
}
