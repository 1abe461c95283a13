use crate::models::PatientRecord;

pub const SUGGESTION_LIMIT: usize = 8;

/// Known patients whose name contains `query`, ignoring case. Blank input
/// yields nothing.
pub fn suggest<'a>(patients: &'a [PatientRecord], query: &str, limit: usize) -> Vec<&'a PatientRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    patients
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

/// Looks a patient up by reference first, then by exact case-insensitive name.
pub fn resolve<'a>(patients: &'a [PatientRecord], id: Option<i64>, name: &str) -> Option<&'a PatientRecord> {
    id.and_then(|id| patients.iter().find(|p| p.id == id)).or_else(|| {
        let name = name.trim();
        patients.iter().find(|p| p.name.trim().eq_ignore_ascii_case(name))
    })
}
