//! CLI Command Implementations
//!
//! Each function runs one interaction against a fresh `CaseSession`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::FilterArgs;
use crate::config::AppConfig;
use crate::engine::{generate_test_tone, read_clip};
use crate::error::{HeartestError, Result};
use crate::notify::{Notifier, TwilioNotifier};
use crate::records::{Gender, PatientInfo, ValveSite};
use crate::session::{analyze_clip, CaseSession, ReplayStatus};

/// Plot size used for exported SVG files
const SVG_WIDTH: u32 = 960;
const SVG_HEIGHT: u32 = 320;

/// Patient fields and recordings given to `save-case`
#[derive(Debug, Clone, Default)]
pub struct SaveCaseRequest {
    pub name: String,
    pub age: u32,
    pub gender: Option<String>,
    pub notes: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    /// Stored name or WAV path, in aortic, pulmonary, tricuspid, mitral order
    pub recordings: [Option<String>; 4],
    pub phone: Option<String>,
}

/// Build the SMS notifier from configured credentials
pub fn sms_notifier(config: &AppConfig) -> Result<TwilioNotifier> {
    let credentials = config.sms.clone().ok_or_else(|| HeartestError::Config {
        reason: "SMS credentials are not configured; set TWILIO_ACCOUNT_SID, \
                 TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER"
            .to_string(),
    })?;
    Ok(TwilioNotifier::new(credentials, config.sms_timeout))
}

/// Upload a WAV file as the recording of a valve.
pub fn upload(config: &AppConfig, valve: &str, file: &Path) -> Result<()> {
    let site: ValveSite = valve.parse()?;
    info!("Uploading {} for {}", file.display(), site);

    let mut session = CaseSession::from_config(config);
    let name = session.upload_file(site, file)?;

    println!("Stored: {}", name);
    println!("Use this name with 'save-case --{}'", site.label().to_lowercase());
    Ok(())
}

/// Store a synthetic tone as the recording of a valve.
pub fn record_tone(config: &AppConfig, valve: &str, frequency: f32, seconds: f32, rate: u32) -> Result<()> {
    let site: ValveSite = valve.parse()?;
    let clip = generate_test_tone(frequency, seconds, rate)?;

    let mut session = CaseSession::from_config(config);
    let name = session.record(site, &clip)?;

    println!(
        "Recorded {:.1}s at {} Hz for {}: {}",
        clip.duration_secs(),
        clip.sample_rate(),
        site,
        name
    );
    Ok(())
}

/// Condition and plot one recording.
///
/// `file` is tried as a path first, then as a name in the upload directory.
pub fn analyze(
    config: &AppConfig,
    file: &str,
    filter: &FilterArgs,
    svg: Option<&Path>,
    wav: Option<&Path>,
    json: bool,
) -> Result<()> {
    let session = CaseSession::from_config(config);
    let path = resolve_recording(&session, file)?;
    info!("Analyzing {}", path.display());

    let clip = read_clip(&path)?;
    let params = filter.to_params(&clip);
    let analysis = analyze_clip(&clip, file, &params)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("=== {} ===", analysis.label);
        println!(
            "Gain: {} | Duration: {:.2}s | Cutoff: {}",
            params.gain, params.duration_secs, params.cutoff
        );
        if let Some((start, end)) = params.zoom {
            println!("Zoom: {:.2}s - {:.2}s", start, end);
        }
        println!(
            "Filtered: {} samples at {} Hz ({} plot points)",
            analysis.samples,
            analysis.sample_rate,
            analysis.plot.len()
        );
    }

    if let Some(svg_path) = svg {
        fs::write(svg_path, analysis.plot.to_svg(SVG_WIDTH, SVG_HEIGHT))?;
        println!("Plot written to: {}", svg_path.display());
    }
    if let Some(wav_path) = wav {
        fs::write(wav_path, &analysis.filtered_wav)?;
        println!("Filtered audio written to: {}", wav_path.display());
    }

    Ok(())
}

/// Save a case with all four recordings, then optionally text its summary.
///
/// A failed text is reported but never undoes the save.
pub fn save_case(config: &AppConfig, request: &SaveCaseRequest) -> Result<()> {
    let mut session = CaseSession::from_config(config);

    for (site, recording) in ValveSite::ALL.into_iter().zip(&request.recordings) {
        let Some(recording) = recording else { continue };

        let path = Path::new(recording);
        if path.is_file() {
            session.upload_file(site, path)?;
        } else {
            session.attach(site, recording)?;
        }
    }

    let mut patient = PatientInfo::new(request.name.trim(), request.age);
    patient.gender = request
        .gender
        .as_deref()
        .map(str::parse::<Gender>)
        .transpose()?;
    patient.notes = request.notes.clone();
    patient.height_cm = request.height_cm;
    patient.weight_kg = request.weight_kg;

    let record = session.save_case(&patient)?;
    println!("Case saved: {}", record.headline());
    if let Some(bmi) = record.bmi {
        println!("BMI: {:.2}", bmi);
    }

    if let Some(phone) = &request.phone {
        let sent = sms_notifier(config)
            .and_then(|notifier| session.send_summary(&notifier, phone, &record));
        match sent {
            Ok(()) => println!("Summary sent to {}", phone),
            Err(e) => println!("Case saved, but the summary was not sent: {}", e),
        }
    }

    Ok(())
}

/// List saved cases, newest first, optionally writing a plot per recording.
pub fn history(config: &AppConfig, plots_dir: Option<&Path>) -> Result<()> {
    let session = CaseSession::from_config(config);
    let entries = session.history(None)?;

    if entries.is_empty() {
        println!("No patient records yet.");
        return Ok(());
    }
    if let Some(dir) = plots_dir {
        fs::create_dir_all(dir)?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let record = &entry.record;
        println!("{:-<60}", "");
        println!("[{}] {}", i, record.headline());
        println!(
            "    Gender: {}",
            record
                .gender
                .map(|g| g.to_string())
                .unwrap_or_else(|| "Unspecified".to_string())
        );
        if let Some(bmi) = record.bmi {
            println!("    BMI: {:.2}", bmi);
        }
        if !record.notes.is_empty() {
            println!("    Notes: {}", record.notes);
        }

        for valve in &entry.valves {
            let site = valve.site.map(|s| s.label()).unwrap_or("Extra");
            match &valve.status {
                ReplayStatus::Ready(analysis) => {
                    println!(
                        "    {:<10} {} ({:.1}s)",
                        site,
                        valve.file,
                        analysis.params.duration_secs
                    );
                    if let Some(dir) = plots_dir {
                        let svg_path = plot_path(dir, i, &valve.file);
                        fs::write(&svg_path, analysis.plot.to_svg(SVG_WIDTH, SVG_HEIGHT))?;
                    }
                }
                ReplayStatus::Missing { path } => {
                    println!("    {:<10} Audio file missing: {}", site, path.display());
                }
                ReplayStatus::Failed { reason } => {
                    println!("    {:<10} {} could not be read: {}", site, valve.file, reason);
                }
            }
        }
    }
    println!("{:-<60}", "");

    if let Some(dir) = plots_dir {
        println!("Plots written to: {}", dir.display());
    }
    Ok(())
}

/// Text the summary of a case picked from the history listing.
pub fn send_sms(config: &AppConfig, phone: &str, case: usize) -> Result<()> {
    let session = CaseSession::from_config(config);
    let records = session.store().list_all()?;

    let record = records.get(case).ok_or_else(|| {
        HeartestError::invalid_parameter(
            "case",
            case,
            format!("an index below {} (see 'history')", records.len()),
        )
    })?;

    let notifier = sms_notifier(config)?;
    info!("Sending summary of '{}' via {}", record.name, notifier.name());
    match session.send_summary(&notifier, phone, record) {
        Ok(()) => {
            println!("Summary of {} sent to {}", record.headline(), phone);
            Ok(())
        }
        Err(e) => {
            warn!("SMS failed: {}", e);
            Err(e)
        }
    }
}

fn resolve_recording(session: &CaseSession, file: &str) -> Result<PathBuf> {
    let path = Path::new(file);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    session.uploads().resolve(file)
}

fn plot_path(dir: &Path, case: usize, file: &str) -> PathBuf {
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());
    dir.join(format!("case{}_{}.svg", case, stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{write_clip, AudioClip};
    use tempfile::{tempdir, TempDir};

    fn config() -> (TempDir, AppConfig) {
        let dir = tempdir().unwrap();
        let config = AppConfig {
            upload_dir: dir.path().join("uploaded_audios"),
            store_path: dir.path().join("patient_data.json"),
            ..AppConfig::default()
        };
        (dir, config)
    }

    fn wav_on_disk(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        write_clip(&generate_test_tone(35.0, 1.0, 4000).unwrap(), &path).unwrap();
        path
    }

    #[test]
    fn test_save_case_from_paths_and_names() {
        let (dir, config) = config();
        record_tone(&config, "mitral", 40.0, 1.0, 4000).unwrap();

        let a = wav_on_disk(dir.path(), "a.wav");
        let p = wav_on_disk(dir.path(), "p.wav");
        let t = wav_on_disk(dir.path(), "t.wav");

        let request = SaveCaseRequest {
            name: "Test".to_string(),
            age: 30,
            gender: Some("male".to_string()),
            recordings: [
                Some(a.display().to_string()),
                Some(p.display().to_string()),
                Some(t.display().to_string()),
                Some("Mitral_recorded.wav".to_string()),
            ],
            ..SaveCaseRequest::default()
        };
        save_case(&config, &request).unwrap();

        let session = CaseSession::from_config(&config);
        let saved = session.store().list_all().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(
            saved[0].files,
            vec!["Aortic_a.wav", "Pulmonary_p.wav", "Tricuspid_t.wav", "Mitral_recorded.wav"]
        );
        assert_eq!(saved[0].gender, Some(Gender::Male));
    }

    #[test]
    fn test_save_case_without_sms_config_still_saves() {
        let (_dir, config) = config();
        for valve in ["aortic", "pulmonary", "tricuspid", "mitral"] {
            record_tone(&config, valve, 40.0, 0.5, 4000).unwrap();
        }

        let request = SaveCaseRequest {
            name: "Ann".to_string(),
            age: 52,
            recordings: ValveSite::ALL.map(|s| Some(format!("{}_recorded.wav", s.label()))),
            phone: Some("+15558675309".to_string()),
            ..SaveCaseRequest::default()
        };
        save_case(&config, &request).unwrap();

        assert_eq!(CaseSession::from_config(&config).store().len().unwrap(), 1);
    }

    #[test]
    fn test_save_case_incomplete_is_rejected() {
        let (_dir, config) = config();
        record_tone(&config, "aortic", 40.0, 0.5, 4000).unwrap();

        let request = SaveCaseRequest {
            name: "Bo".to_string(),
            age: 40,
            recordings: [Some("Aortic_recorded.wav".to_string()), None, None, None],
            ..SaveCaseRequest::default()
        };
        let err = save_case(&config, &request).unwrap_err();

        assert_eq!(err.error_code(), "INCOMPLETE_VALVE_SET");
        assert!(!config.store_path.exists());
    }

    #[test]
    fn test_analyze_writes_outputs() {
        let (dir, config) = config();
        let input = wav_on_disk(dir.path(), "in.wav");
        let svg = dir.path().join("plot.svg");
        let wav = dir.path().join("out.wav");

        let filter = FilterArgs {
            gain: 1.5,
            duration: None,
            cutoff: 0.05,
            zoom_start: Some(0.1),
            zoom_end: Some(0.5),
        };
        analyze(
            &config,
            &input.display().to_string(),
            &filter,
            Some(&svg),
            Some(&wav),
            false,
        )
        .unwrap();

        assert!(fs::read_to_string(&svg).unwrap().starts_with("<svg"));
        let filtered: AudioClip = read_clip(&wav).unwrap();
        assert_eq!(filtered.len(), 4000);
    }

    #[test]
    fn test_send_sms_requires_credentials() {
        let (_dir, config) = config();
        let err = sms_notifier(&config).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_send_sms_bad_case_index() {
        let (_dir, config) = config();
        let err = send_sms(&config, "+15558675309", 3).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }
}
