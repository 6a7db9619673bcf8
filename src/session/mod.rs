//! Case session pipeline
//!
//! One `CaseSession` carries the state of a single intake: where files
//! live and which valve recordings have been collected so far. Every
//! step (ingest, condition, render, persist, notify) takes that state
//! explicitly instead of reaching for globals.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::AppConfig;
use crate::dsp::{condition, FilterParameters};
use crate::engine::{decode_clip, encode_wav, read_clip, AudioClip};
use crate::error::{HeartestError, Result};
use crate::notify::{send_case_summary, Notifier};
use crate::records::{
    CaseRecord, CaseStore, PatientInfo, UploadDirectory, ValveSet, ValveSite,
};
use crate::render::{render_conditioned, WaveformPlot};

/// Result of conditioning and rendering one recording
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub label: String,
    pub params: FilterParameters,
    pub plot: WaveformPlot,
    /// Filtered audio as a playable 16-bit WAV file
    #[serde(skip)]
    pub filtered_wav: Vec<u8>,
    pub sample_rate: u32,
    pub samples: usize,
}

/// Condition a clip and produce its plot and playable audio
pub fn analyze_clip(clip: &AudioClip, label: &str, params: &FilterParameters) -> Result<Analysis> {
    let conditioned = condition(clip, params)?;
    let plot = render_conditioned(&conditioned, label);
    let filtered_wav = encode_wav(&conditioned.filtered)?;

    Ok(Analysis {
        label: label.to_string(),
        params: *params,
        plot,
        filtered_wav,
        sample_rate: conditioned.filtered.sample_rate(),
        samples: conditioned.filtered.len(),
    })
}

/// What happened when a stored recording was replayed from history
#[derive(Debug, Clone)]
pub enum ReplayStatus {
    Ready(Box<Analysis>),
    /// The file is no longer in the upload directory
    Missing { path: PathBuf },
    /// The file exists but could not be decoded or conditioned
    Failed { reason: String },
}

/// One stored recording of a historical case
#[derive(Debug, Clone)]
pub struct ValveReplay {
    /// Site by position in the record; `None` for extra legacy entries
    pub site: Option<ValveSite>,
    pub file: String,
    pub status: ReplayStatus,
}

/// A historical case with its recordings replayed
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: CaseRecord,
    pub valves: Vec<ValveReplay>,
}

/// Per-intake state and the operations of one interaction
#[derive(Debug, Clone)]
pub struct CaseSession {
    uploads: UploadDirectory,
    store: CaseStore,
    valves: ValveSet,
}

impl CaseSession {
    pub fn new(uploads: UploadDirectory, store: CaseStore) -> Self {
        Self {
            uploads,
            store,
            valves: ValveSet::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            UploadDirectory::new(&config.upload_dir),
            CaseStore::new(&config.store_path),
        )
    }

    pub fn uploads(&self) -> &UploadDirectory {
        &self.uploads
    }

    pub fn store(&self) -> &CaseStore {
        &self.store
    }

    pub fn valves(&self) -> &ValveSet {
        &self.valves
    }

    /// Accept uploaded WAV bytes for a valve
    ///
    /// The bytes are decoded first so that a broken upload never reaches
    /// the upload directory.
    pub fn upload(&mut self, valve: ValveSite, original_name: &str, bytes: &[u8]) -> Result<String> {
        let clip = decode_clip(bytes)?;
        let name = self.uploads.store(valve, original_name, bytes)?;
        log::debug!(
            "{}: {} samples at {} Hz",
            name,
            clip.len(),
            clip.sample_rate()
        );

        self.valves.insert(valve, name.clone());
        Ok(name)
    }

    /// Upload a WAV file from disk for a valve
    pub fn upload_file(&mut self, valve: ValveSite, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(HeartestError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path)?;
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.upload(valve, &original_name, &bytes)
    }

    /// Use a file already in the upload directory for a valve
    pub fn attach(&mut self, valve: ValveSite, stored_name: &str) -> Result<()> {
        self.uploads.resolve(stored_name)?;
        self.valves.insert(valve, stored_name);
        Ok(())
    }

    /// Store a microphone recording for a valve
    pub fn record(&mut self, valve: ValveSite, clip: &AudioClip) -> Result<String> {
        if clip.is_empty() {
            return Err(HeartestError::EmptyAudio);
        }
        let name = self.uploads.store_recording(valve, clip)?;
        self.valves.insert(valve, name.clone());
        Ok(name)
    }

    /// Condition and render a stored recording
    pub fn analyze(&self, stored_name: &str, params: &FilterParameters) -> Result<Analysis> {
        let path = self.uploads.resolve(stored_name)?;
        let clip = read_clip(&path)?;
        analyze_clip(&clip, stored_name, params)
    }

    /// Save the case once all four valves are present
    ///
    /// # Errors
    /// * `IncompleteValveSet` - If a valve is missing; nothing is written
    /// * `InvalidParameter` - If the patient fields are invalid
    pub fn save_case(&self, patient: &PatientInfo) -> Result<CaseRecord> {
        let record = CaseRecord::now(patient, &self.valves)?;
        self.store.append(record.clone())?;
        Ok(record)
    }

    /// Text the case summary to a phone number
    ///
    /// Failure is returned for the caller to report; the saved case stays.
    pub fn send_summary(
        &self,
        notifier: &dyn Notifier,
        phone: &str,
        record: &CaseRecord,
    ) -> Result<()> {
        send_case_summary(notifier, phone, record).map_err(|e| {
            log::warn!("Case summary for {} not sent: {}", record.name, e);
            e
        })
    }

    /// Saved cases, newest first, with each recording replayed
    ///
    /// `params` applies to every recording; without it each clip uses its
    /// own defaults. A missing or broken recording is reported in its
    /// entry and never stops the rest of the history.
    pub fn history(&self, params: Option<&FilterParameters>) -> Result<Vec<HistoryEntry>> {
        let records = self.store.list_all()?;

        Ok(records
            .into_iter()
            .map(|record| {
                let valves = record
                    .files
                    .iter()
                    .enumerate()
                    .map(|(i, file)| ValveReplay {
                        site: ValveSite::ALL.get(i).copied(),
                        file: file.clone(),
                        status: self.replay(file, params),
                    })
                    .collect();
                HistoryEntry { record, valves }
            })
            .collect())
    }

    fn replay(&self, file: &str, params: Option<&FilterParameters>) -> ReplayStatus {
        let path = match self.uploads.resolve(file) {
            Ok(path) => path,
            Err(HeartestError::FileNotFound { path }) => {
                log::warn!("Audio file missing: {}", path.display());
                return ReplayStatus::Missing { path };
            }
            Err(e) => {
                log::warn!("Refusing to replay {}: {}", file, e);
                return ReplayStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let analysis = read_clip(&path).and_then(|clip| {
            let params = params
                .copied()
                .unwrap_or_else(|| FilterParameters::defaults_for(&clip));
            analyze_clip(&clip, file, &params)
        });

        match analysis {
            Ok(analysis) => ReplayStatus::Ready(Box::new(analysis)),
            Err(e) => {
                log::warn!("Could not replay {}: {}", file, e);
                ReplayStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;
    use crate::notify::RecordingNotifier;
    use tempfile::{tempdir, TempDir};

    fn session() -> (TempDir, CaseSession) {
        let dir = tempdir().unwrap();
        let session = CaseSession::new(
            UploadDirectory::new(dir.path().join("uploaded_audios")),
            CaseStore::new(dir.path().join("patient_data.json")),
        );
        (dir, session)
    }

    fn tone_bytes(freq: f32) -> Vec<u8> {
        encode_wav(&generate_test_tone(freq, 2.0, 2000).unwrap()).unwrap()
    }

    fn upload_all(session: &mut CaseSession) {
        for (i, site) in ValveSite::ALL.into_iter().enumerate() {
            session
                .upload(site, "beat.wav", &tone_bytes(30.0 + 10.0 * i as f32))
                .unwrap();
        }
    }

    #[test]
    fn test_upload_keys_by_valve() {
        let (_dir, mut session) = session();
        let name = session
            .upload(ValveSite::Aortic, "beat.wav", &tone_bytes(40.0))
            .unwrap();

        assert_eq!(name, "Aortic_beat.wav");
        assert_eq!(session.valves().get(ValveSite::Aortic), Some("Aortic_beat.wav"));
        assert!(session.uploads().resolve(&name).is_ok());
    }

    #[test]
    fn test_upload_rejects_non_wav() {
        let (_dir, mut session) = session();
        assert!(session.upload(ValveSite::Mitral, "notes.txt", b"hello").is_err());
        assert!(session.valves().is_empty());
        assert!(session.uploads().resolve("Mitral_notes.txt").is_err());
    }

    #[test]
    fn test_analyze_stored_recording() {
        let (_dir, mut session) = session();
        let name = session
            .upload(ValveSite::Pulmonary, "p.wav", &tone_bytes(25.0))
            .unwrap();

        let analysis = session
            .analyze(&name, &FilterParameters::new(2.0, 1.0, 0.05))
            .unwrap();

        assert_eq!(analysis.samples, 2000);
        assert_eq!(analysis.sample_rate, 2000);
        assert!(!analysis.plot.is_empty());
        assert_eq!(decode_clip(&analysis.filtered_wav).unwrap().len(), 2000);
    }

    #[test]
    fn test_save_requires_four_valves() {
        let (_dir, mut session) = session();
        session
            .upload(ValveSite::Aortic, "a.wav", &tone_bytes(40.0))
            .unwrap();

        let err = session.save_case(&PatientInfo::new("Eve", 61)).unwrap_err();
        assert_eq!(err.error_code(), "INCOMPLETE_VALVE_SET");
        assert_eq!(session.store().len().unwrap(), 0);
    }

    #[test]
    fn test_save_then_notify_failure_keeps_case() {
        let (_dir, mut session) = session();
        upload_all(&mut session);

        let record = session.save_case(&PatientInfo::new("Eve", 61)).unwrap();
        let notifier = RecordingNotifier::failing("network down");

        assert!(session
            .send_summary(&notifier, "+15558675309", &record)
            .is_err());
        assert_eq!(session.store().list_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_history_reports_missing_files_and_continues() {
        let (_dir, mut session) = session();
        upload_all(&mut session);
        session.save_case(&PatientInfo::new("First", 30)).unwrap();

        fs::remove_file(session.uploads().path_of("Tricuspid_beat.wav")).unwrap();
        session.save_case(&PatientInfo::new("Second", 31)).unwrap();

        let history = session.history(None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].record.name, "Second");

        let statuses = &history[1].valves;
        assert_eq!(statuses.len(), 4);
        assert!(matches!(statuses[0].status, ReplayStatus::Ready(_)));
        assert_eq!(statuses[2].site, Some(ValveSite::Tricuspid));
        assert!(matches!(statuses[2].status, ReplayStatus::Missing { .. }));
        assert!(matches!(statuses[3].status, ReplayStatus::Ready(_)));
    }

    #[test]
    fn test_history_reports_undecodable_files() {
        let (_dir, mut session) = session();
        upload_all(&mut session);
        session.save_case(&PatientInfo::new("Fay", 45)).unwrap();
        fs::write(session.uploads().path_of("Mitral_beat.wav"), b"garbage").unwrap();

        let history = session.history(None).unwrap();
        assert!(matches!(
            history[0].valves[3].status,
            ReplayStatus::Failed { .. }
        ));
        assert!(matches!(history[0].valves[0].status, ReplayStatus::Ready(_)));
    }

    #[test]
    fn test_attach_rejects_paths_outside_uploads() {
        let (dir, mut session) = session();
        fs::write(dir.path().join("outside.wav"), tone_bytes(40.0)).unwrap();

        let err = session
            .attach(ValveSite::Aortic, "../outside.wav")
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(session.valves().is_empty());
    }

    #[test]
    fn test_upload_with_comma_survives_save_and_history() {
        let (_dir, mut session) = session();
        upload_all(&mut session);
        let name = session
            .upload(ValveSite::Aortic, "visit 2, left.wav", &tone_bytes(40.0))
            .unwrap();

        let saved = session.save_case(&PatientInfo::new("Gus", 58)).unwrap();
        let back = session.store().list_all().unwrap();
        assert_eq!(back, vec![saved]);
        assert_eq!(back[0].files[0], name);

        let history = session.history(None).unwrap();
        let sites: Vec<_> = history[0].valves.iter().map(|v| v.site).collect();
        assert_eq!(sites, ValveSite::ALL.map(Some).to_vec());
        assert!(history[0]
            .valves
            .iter()
            .all(|v| matches!(v.status, ReplayStatus::Ready(_))));
    }

    #[test]
    fn test_record_attaches_valve() {
        let (_dir, mut session) = session();
        let clip = generate_test_tone(30.0, 1.0, 48000).unwrap();
        let name = session.record(ValveSite::Tricuspid, &clip).unwrap();
        assert_eq!(session.valves().get(ValveSite::Tricuspid), Some(name.as_str()));
    }
}
