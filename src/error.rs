/// Errors produced by note conversion and spectrum capture.
///
/// Conversion errors (`InvalidNote`, `InvalidFrequency`, `MalformedNoteString`)
/// mean the input was bad and are returned straight to the caller. Capture
/// errors are classified once, at the point where the audio device is opened,
/// so the CLI can tell a refused permission apart from a missing device.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PitchError {
    /// The letter-class is not one of the 12 chromatic symbols.
    #[error("Unknown note name: {0:?}")]
    InvalidNote(String),

    /// Frequency is zero, negative, not finite, or not a number at all.
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// The combined note string has no integer octave suffix.
    #[error("Malformed note string: {0:?} (expected something like C#4 or A-1)")]
    MalformedNoteString(String),

    /// Access to the microphone was refused by the OS or the audio server.
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    /// No usable input device, or the stream could not be built or started.
    #[error("Audio input unavailable: {0}")]
    DeviceUnavailable(String),

    /// A capture is already running on this listener.
    #[error("A capture is already in progress")]
    CaptureInProgress,
}

/// Convenience result type for pitch conversion and capture.
pub type Result<T> = std::result::Result<T, PitchError>;

impl PitchError {
    /// Text shown to the user when a capture fails.
    ///
    /// Permission problems get their own instructions because they are the
    /// one failure the user can fix without touching hardware.
    pub fn user_message(&self) -> String {
        match self {
            PitchError::PermissionDenied(_) => "Microphone access was denied. \
                Allow this program to use the microphone in your system's \
                privacy settings (or add your user to the audio group), then try again."
                .into(),
            PitchError::DeviceUnavailable(_) => "There was an error trying to turn the \
                sound into hertz. Check that a microphone is connected, or run \
                `pitchscope devices` to see the available inputs."
                .into(),
            PitchError::CaptureInProgress => {
                "Already listening. Wait for the current capture to finish.".into()
            }
            other => other.to_string(),
        }
    }
}

/// Keywords that audio backends use when the OS refuses access to an input.
/// ALSA reports EACCES as "Permission denied"; CoreAudio and WASAPI report
/// "not authorized" / "access denied" style texts.
const PERMISSION_MARKERS: &[&str] = &[
    "permission",
    "denied",
    "not authorized",
    "unauthorized",
    "not permitted",
    "eacces",
    "access",
];

/// Classify a capture failure from the backend's error text.
///
/// cpal has no dedicated permission variant, so the distinction has to be
/// made from the description the backend gives us.
pub fn classify_capture_error(message: &str) -> PitchError {
    let lower = message.to_lowercase();
    if PERMISSION_MARKERS.iter().any(|m| lower.contains(m)) {
        PitchError::PermissionDenied(message.to_string())
    } else {
        PitchError::DeviceUnavailable(message.to_string())
    }
}
