#[cfg(target_os = "macos")]
pub mod coreaudio;

#[cfg(target_os = "macos")]
pub use coreaudio::CoreAudioHardware;
