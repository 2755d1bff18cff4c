#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Provisioning,
    PreparingSpectrum,
    CompilingScript,
    LaunchingEngine,
    RunningEngine,
    CollectingResults,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Provisioning => "Provisioning engine",
            Self::PreparingSpectrum => "Preparing spectrum",
            Self::CompilingScript => "Compiling script",
            Self::LaunchingEngine => "Launching engine",
            Self::RunningEngine => "Running engine",
            Self::CollectingResults => "Collecting results",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineProgress {
    pub elapsed_s: u64,
    pub pulse_pct: u8,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub engine: Option<EngineProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            engine: None,
        }
    }
}
