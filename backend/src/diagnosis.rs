use shared::{CropCategory, HealthStatus};

/// Separates plant from condition in class names such as `Rice___Leaf_Blast`.
pub const LABEL_DELIMITER: &str = "___";

pub const HEALTHY_COLOR: &str = "#10b981";
pub const INFECTED_COLOR: &str = "#ef4444";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub plant: String,
    pub disease: String,
    pub status: HealthStatus,
}

pub fn diagnose(top_label: &str, crop: CropCategory) -> Diagnosis {
    let (plant, disease) = match top_label.split_once(LABEL_DELIMITER) {
        Some((plant, disease)) => (plant.to_string(), disease),
        None => (crop.to_string(), top_label),
    };

    let disease = disease.replace('_', " ");
    let status = if disease.to_lowercase().contains("healthy") {
        HealthStatus::Healthy
    } else {
        HealthStatus::Infected
    };

    Diagnosis {
        plant,
        disease,
        status,
    }
}

pub fn display_color(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => HEALTHY_COLOR,
        HealthStatus::Infected => INFECTED_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plant_and_condition() {
        let d = diagnose("Rice___Leaf_Blast", CropCategory::Rice);
        assert_eq!(d.plant, "Rice");
        assert_eq!(d.disease, "Leaf Blast");
        assert_eq!(d.status, HealthStatus::Infected);
        assert_eq!(display_color(d.status), INFECTED_COLOR);
    }

    #[test]
    fn healthy_label() {
        let d = diagnose("Tomato___healthy", CropCategory::Pulses);
        assert_eq!(d.plant, "Tomato");
        assert_eq!(d.status, HealthStatus::Healthy);
        assert_eq!(display_color(d.status), HEALTHY_COLOR);
    }

    #[test]
    fn healthy_match_ignores_case() {
        assert_eq!(
            diagnose("Bean___HEALTHY_leaf", CropCategory::Pulses).status,
            HealthStatus::Healthy
        );
    }

    #[test]
    fn bare_label_uses_selected_crop() {
        let d = diagnose("Bacterial_leaf_blight", CropCategory::Rice);
        assert_eq!(d.plant, "Rice");
        assert_eq!(d.disease, "Bacterial leaf blight");
        assert_eq!(d.status, HealthStatus::Infected);
    }

    #[test]
    fn only_first_delimiter_splits() {
        let d = diagnose("Bean___Angular___Leaf_Spot", CropCategory::Pulses);
        assert_eq!(d.plant, "Bean");
        assert_eq!(d.disease, "Angular   Leaf Spot");
    }

    #[test]
    fn unknown_label_is_infected() {
        let d = diagnose("Unknown", CropCategory::Pulses);
        assert_eq!(d.plant, "Pulses");
        assert_eq!(d.disease, "Unknown");
        assert_eq!(d.status, HealthStatus::Infected);
    }
}
