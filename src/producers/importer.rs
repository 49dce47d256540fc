//! Data Importer
//!
//! Bulk-loads detections from built-in sample sets, a manual form, CSV text
//! or a JSON array. Every successful import appends to the store; nothing is
//! ever replaced.

use crate::detection::{
    clock_time, AuditEvent, Detection, DetectionDraft, DraftDefaults, IdGenerator, DEFAULT_LAT,
    DEFAULT_LNG,
};
use crate::store::DetectionStore;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// Confidence used when an imported record has none or it cannot be parsed
pub const DEFAULT_IMPORT_CONFIDENCE: f64 = 75.0;

const IMPORT_DEFAULTS: DraftDefaults = DraftDefaults {
    camera: "Imported Camera",
    description: "Imported detection",
};

const SAMPLE_CSV: &str = "lat,lng,time,confidence,camera,description,severity
37.2289,-80.4170,14:30,87,Main Entrance,Person in restricted area,high
37.2295,-80.4165,14:35,65,Library Cam 3,Unattended backpack,medium
37.2300,-80.4160,14:40,92,Parking Lot B,Suspicious vehicle,critical
37.2285,-80.4150,14:45,58,Store Aisle,Person concealing items,low
37.2310,-80.4120,14:50,91,Security Checkpoint,Suspicious behavior,critical
";

/// Minimum columns a CSV row needs to be imported
const MIN_CSV_COLUMNS: usize = 6;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Error parsing file: {0}")]
    Parse(String),

    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown import format: {0}")]
    UnknownFormat(String),

    #[error("Unknown sample dataset: {0}")]
    UnknownDataset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        ext.parse().ok()
    }
}

impl FromStr for ImportFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ImportFormat::Csv),
            "json" => Ok(ImportFormat::Json),
            other => Err(ImportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Built-in demonstration datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleDataset {
    CampusSecurity,
    RetailSecurity,
    AirportSecurity,
}

impl SampleDataset {
    pub const ALL: [SampleDataset; 3] = [
        SampleDataset::CampusSecurity,
        SampleDataset::RetailSecurity,
        SampleDataset::AirportSecurity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SampleDataset::CampusSecurity => "campus_security",
            SampleDataset::RetailSecurity => "retail_security",
            SampleDataset::AirportSecurity => "airport_security",
        }
    }

    /// The fixed records, without ids; the importer assigns fresh ones.
    pub fn records(&self) -> Vec<DetectionDraft> {
        let rows: &[(f64, f64, &str, f64, &str, &str, &str)] = match self {
            SampleDataset::CampusSecurity => &[
                (37.2296, -80.4139, "14:30", 87.0, "Main Entrance", "Person in restricted area after hours", "high"),
                (37.2301, -80.4145, "14:35", 65.0, "Library Cam 3", "Unattended backpack detected", "medium"),
                (37.2290, -80.4130, "14:40", 92.0, "Parking Lot B", "Suspicious vehicle circling", "critical"),
            ],
            SampleDataset::RetailSecurity => &[
                (37.2285, -80.4150, "15:15", 83.0, "Store Entrance", "Shoplifting suspect - black hoodie", "high"),
                (37.2288, -80.4148, "15:18", 58.0, "Aisle 3", "Person concealing items", "low"),
            ],
            SampleDataset::AirportSecurity => &[
                (37.2310, -80.4120, "16:00", 91.0, "Security Checkpoint A", "Suspicious behavior at checkpoint", "critical"),
                (37.2305, -80.4115, "16:05", 77.0, "Terminal 1", "Unattended luggage", "high"),
            ],
        };

        rows.iter()
            .map(|&(lat, lng, time, confidence, camera, description, severity)| DetectionDraft {
                lat: Some(lat),
                lng: Some(lng),
                time: Some(time.to_string()),
                confidence: Some(confidence),
                camera: Some(camera.to_string()),
                description: Some(description.to_string()),
                severity: Some(severity.to_string()),
                ..Default::default()
            })
            .collect()
    }
}

impl fmt::Display for SampleDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleDataset {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "campus_security" | "campus" => Ok(SampleDataset::CampusSecurity),
            "retail_security" | "retail" => Ok(SampleDataset::RetailSecurity),
            "airport_security" | "airport" => Ok(SampleDataset::AirportSecurity),
            other => Err(ImportError::UnknownDataset(other.to_string())),
        }
    }
}

/// Single-record form; every field is free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualEntry {
    pub lat: String,
    pub lng: String,
    pub time: String,
    pub confidence: String,
    pub camera: String,
    pub description: String,
    pub severity: String,
}

impl Default for ManualEntry {
    fn default() -> Self {
        Self {
            lat: DEFAULT_LAT.to_string(),
            lng: DEFAULT_LNG.to_string(),
            time: clock_time(&Local::now()),
            confidence: "85".to_string(),
            camera: "Camera C1".to_string(),
            description: "Suspicious individual detected".to_string(),
            severity: "medium".to_string(),
        }
    }
}

impl ManualEntry {
    fn into_draft(self) -> DetectionDraft {
        DetectionDraft {
            lat: self.lat.trim().parse().ok(),
            lng: self.lng.trim().parse().ok(),
            time: Some(self.time),
            confidence: self.confidence.trim().parse().ok(),
            camera: Some(self.camera),
            description: Some(self.description),
            severity: Some(self.severity),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum ImportSource {
    Sample(SampleDataset),
    Manual(ManualEntry),
    Csv(String),
    Json(String),
}

impl ImportSource {
    pub fn from_text(format: ImportFormat, content: String) -> Self {
        match format {
            ImportFormat::Csv => ImportSource::Csv(content),
            ImportFormat::Json => ImportSource::Json(content),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ImportSource::Sample(_) => "sample",
            ImportSource::Manual(_) => "manual",
            ImportSource::Csv(_) => "csv",
            ImportSource::Json(_) => "json",
        }
    }
}

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    /// CSV rows dropped for having too few columns
    pub skipped: usize,
}

/// Parse CSV text with the fixed column order
/// `lat,lng,time,confidence,camera,description,severity`.
///
/// The first line is a header. Blank lines are ignored; rows with fewer than
/// six columns are counted in the second tuple element and dropped. Numeric
/// defaults apply only when a field does not parse; a literal `0` is kept.
pub fn parse_csv(content: &str) -> (Vec<DetectionDraft>, usize) {
    let mut drafts = Vec::new();
    let mut skipped = 0;

    for line in content.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        if values.len() < MIN_CSV_COLUMNS {
            skipped += 1;
            continue;
        }

        drafts.push(DetectionDraft {
            lat: Some(values[0].parse().unwrap_or(DEFAULT_LAT)),
            lng: Some(values[1].parse().unwrap_or(DEFAULT_LNG)),
            time: Some(values[2].to_string()),
            confidence: Some(
                values[3]
                    .parse::<f64>()
                    .map(f64::trunc)
                    .unwrap_or(DEFAULT_IMPORT_CONFIDENCE),
            ),
            camera: Some(values[4].to_string()),
            description: Some(values[5].to_string()),
            severity: values.get(6).map(|s| s.to_string()),
            ..Default::default()
        });
    }

    (drafts, skipped)
}

/// Parse a JSON array of detection-shaped objects. Any error rejects the
/// whole document.
pub fn parse_json(content: &str) -> Result<Vec<DetectionDraft>, ImportError> {
    serde_json::from_str::<Vec<DetectionDraft>>(content).map_err(|e| ImportError::Parse(e.to_string()))
}

/// The downloadable CSV template
pub fn sample_csv() -> &'static str {
    SAMPLE_CSV
}

#[derive(Debug)]
pub struct DataImporter {
    ids: IdGenerator,
    manual_ids: IdGenerator,
}

impl Default for DataImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DataImporter {
    pub fn new() -> Self {
        Self {
            ids: IdGenerator::new("imported"),
            manual_ids: IdGenerator::new("manual"),
        }
    }

    /// Import from `source` and append the result to `store`.
    ///
    /// A JSON parse failure aborts before anything is appended. An import
    /// that yields no records leaves the store and the audit log untouched.
    pub async fn import(
        &self,
        source: ImportSource,
        store: &DetectionStore,
    ) -> Result<ImportReport, ImportError> {
        let kind = source.kind();
        let (drafts, ids, skipped) = match source {
            ImportSource::Sample(dataset) => (dataset.records(), &self.ids, 0),
            ImportSource::Manual(entry) => (vec![entry.into_draft()], &self.manual_ids, 0),
            ImportSource::Csv(content) => {
                let (drafts, skipped) = parse_csv(&content);
                (drafts, &self.ids, skipped)
            }
            ImportSource::Json(content) => match parse_json(&content) {
                Ok(drafts) => (drafts, &self.ids, 0),
                Err(e) => {
                    warn!(error = %e, "json import rejected");
                    return Err(e);
                }
            },
        };

        let now = Local::now();
        let detections: Vec<Detection> = drafts
            .into_iter()
            .map(|mut draft| {
                draft.confidence.get_or_insert(DEFAULT_IMPORT_CONFIDENCE);
                draft.into_detection(ids, &IMPORT_DEFAULTS, &now)
            })
            .collect();

        let imported = detections.len();
        if imported == 0 {
            info!(source = kind, skipped, "import produced no detections");
            return Ok(ImportReport { imported, skipped });
        }

        let first_camera = detections[0].camera.clone();
        store.append_many(detections).await;
        store
            .append_audit(
                AuditEvent::now("DataImporter", format!("Imported {} detections", imported))
                    .with_detail(format!("From {}", first_camera)),
            )
            .await;

        info!(source = kind, imported, skipped, "import complete");
        Ok(ImportReport { imported, skipped })
    }

    /// Read a file and turn it into an import source. The format comes from
    /// `format` or, failing that, the file extension.
    pub async fn load_file(
        &self,
        path: impl AsRef<Path>,
        format: Option<ImportFormat>,
    ) -> Result<ImportSource, ImportError> {
        let path = path.as_ref();
        let format = match format.or_else(|| ImportFormat::from_path(path)) {
            Some(format) => format,
            None => return Err(ImportError::UnknownFormat(path.display().to_string())),
        };
        let content = tokio::fs::read_to_string(path).await?;
        Ok(ImportSource::from_text(format, content))
    }

    /// Empty the store; see [`DetectionStore::clear`]
    pub async fn clear_all(&self, store: &DetectionStore) -> AuditEvent {
        store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const HEADER: &str = "lat,lng,time,confidence,camera,description,severity";

    #[test]
    fn csv_row_maps_columns_in_order() {
        let content = format!("{}\n37.1,-80.1,14:00,90,CamX,Test desc,high\n", HEADER);
        let (drafts, skipped) = parse_csv(&content);
        assert_eq!(skipped, 0);
        assert_eq!(drafts.len(), 1);

        let d = drafts[0]
            .clone()
            .into_detection(&IdGenerator::new("t"), &IMPORT_DEFAULTS, &Local::now());
        assert_eq!(d.lat, 37.1);
        assert_eq!(d.lng, -80.1);
        assert_eq!(d.time, "14:00");
        assert_eq!(d.confidence, 90);
        assert_eq!(d.camera, "CamX");
        assert_eq!(d.description, "Test desc");
        assert_eq!(d.severity, Severity::High);
    }

    #[test]
    fn short_csv_rows_are_skipped() {
        let content = format!("{}\n37.1,-80.1,14:00,90\n\n37.2,-80.2,15:00,70,Cam,Desc\n", HEADER);
        let (drafts, skipped) = parse_csv(&content);
        assert_eq!(drafts.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(drafts[0].severity, None);
    }

    #[test]
    fn unparseable_csv_numbers_fall_back() {
        let content = format!("{}\nnorth,west,,lots,,,\n", HEADER);
        let (drafts, _) = parse_csv(&content);
        let d = drafts[0]
            .clone()
            .into_detection(&IdGenerator::new("t"), &IMPORT_DEFAULTS, &Local::now());
        assert_eq!(d.lat, DEFAULT_LAT);
        assert_eq!(d.lng, DEFAULT_LNG);
        assert_eq!(d.confidence, 75);
        assert_eq!(d.camera, "Imported Camera");
        assert_eq!(d.description, "Imported detection");
        assert_eq!(d.severity, Severity::Medium);
        assert!(!d.time.is_empty());
    }

    #[test]
    fn literal_zero_csv_numbers_are_kept() {
        let content = format!("{}
0,0,09:00,0,Pier,Buoy,low
", HEADER);
        let (drafts, _) = parse_csv(&content);
        let d = drafts[0]
            .clone()
            .into_detection(&IdGenerator::new("t"), &IMPORT_DEFAULTS, &Local::now());
        assert_eq!((d.lat, d.lng), (0.0, 0.0));
        assert_eq!(d.confidence, 0);
    }

    #[test]
    fn template_parses_cleanly() {
        let (drafts, skipped) = parse_csv(sample_csv());
        assert_eq!(drafts.len(), 5);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn dataset_names_parse() {
        assert_eq!(
            "campus_security".parse::<SampleDataset>().unwrap(),
            SampleDataset::CampusSecurity
        );
        assert_eq!("airport".parse::<SampleDataset>().unwrap(), SampleDataset::AirportSecurity);
        assert!("stadium".parse::<SampleDataset>().is_err());
        assert_eq!(SampleDataset::RetailSecurity.records().len(), 2);
    }

    #[tokio::test]
    async fn sample_import_appends_with_fresh_ids_and_audit() {
        let store = DetectionStore::new();
        let importer = DataImporter::new();

        let report = importer
            .import(ImportSource::Sample(SampleDataset::CampusSecurity), &store)
            .await
            .unwrap();
        assert_eq!(report, ImportReport { imported: 3, skipped: 0 });

        let detections = store.detections().await;
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].camera, "Main Entrance");
        assert!(detections.iter().all(|d| d.id.starts_with("imported_")));

        let audit = store.audit_log().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].actor, "DataImporter");
        assert_eq!(audit[0].action, "Imported 3 detections");
        assert_eq!(audit[0].detail.as_deref(), Some("From Main Entrance"));

        // Importing again appends instead of replacing
        importer
            .import(ImportSource::Sample(SampleDataset::CampusSecurity), &store)
            .await
            .unwrap();
        assert_eq!(store.len().await, 6);
    }

    #[tokio::test]
    async fn malformed_json_appends_nothing() {
        let store = DetectionStore::new();
        let importer = DataImporter::new();
        let result = importer
            .import(ImportSource::Json("[{\"lat\": 1.0,".to_string()), &store)
            .await;

        assert!(matches!(result, Err(ImportError::Parse(_))));
        assert!(store.is_empty().await);
        assert!(store.audit_log().await.is_empty());
    }

    #[tokio::test]
    async fn json_records_are_defaulted() {
        let store = DetectionStore::new();
        let importer = DataImporter::new();
        let json = r#"[{"id": "j1", "lat": 37.3, "lng": "-80.3", "severity": "CRITICAL", "extra": 1}, {}]"#;
        let report = importer
            .import(ImportSource::Json(json.to_string()), &store)
            .await
            .unwrap();
        assert_eq!(report.imported, 2);

        let detections = store.detections().await;
        assert_eq!(detections[0].id, "j1");
        assert_eq!(detections[0].severity, Severity::Critical);
        assert_eq!(detections[0].lng, -80.3);
        assert_eq!(detections[1].camera, "Imported Camera");
        assert_eq!(detections[1].confidence, 75);
    }

    #[tokio::test]
    async fn empty_import_records_nothing() {
        let store = DetectionStore::new();
        let importer = DataImporter::new();
        let report = importer
            .import(ImportSource::Csv(format!("{}\n1,2,3\n", HEADER)), &store)
            .await
            .unwrap();
        assert_eq!(report, ImportReport { imported: 0, skipped: 1 });
        assert!(store.audit_log().await.is_empty());
    }

    #[tokio::test]
    async fn manual_entry_is_parsed_leniently() {
        let store = DetectionStore::new();
        let importer = DataImporter::new();
        let entry = ManualEntry {
            lat: "37.5".into(),
            lng: "oops".into(),
            confidence: "64".into(),
            severity: "low".into(),
            ..Default::default()
        };
        importer.import(ImportSource::Manual(entry), &store).await.unwrap();

        let d = &store.detections().await[0];
        assert!(d.id.starts_with("manual_"));
        assert_eq!(d.lat, 37.5);
        assert_eq!(d.lng, DEFAULT_LNG);
        assert_eq!(d.confidence, 64);
        assert_eq!(d.severity, Severity::Low);
    }

    #[tokio::test]
    async fn load_file_uses_extension() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", sample_csv()).unwrap();

        let importer = DataImporter::new();
        let source = importer.load_file(file.path(), None).await.unwrap();
        assert!(matches!(source, ImportSource::Csv(_)));

        let store = DetectionStore::new();
        let report = importer.import(source, &store).await.unwrap();
        assert_eq!(report.imported, 5);
    }

    #[tokio::test]
    async fn load_file_without_format_fails() {
        let file = tempfile::Builder::new().suffix(".dat").tempfile().unwrap();
        let importer = DataImporter::new();
        let result = importer.load_file(file.path(), None).await;
        assert!(matches!(result, Err(ImportError::UnknownFormat(_))));
    }
}
