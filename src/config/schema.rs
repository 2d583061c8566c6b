/// How a raw setting string is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Int,
    Float,
    Bool,
    Json,
    /// One of a fixed set of strings
    Choice(&'static [&'static str]),
    Text,
    /// `local` or a signed `HHMM` offset
    Timezone,
    /// Integer where `0` means unbounded (stored as `-1`)
    Count,
    /// Integer that reseeds the process random source
    Seed,
    /// Owning-app identifier (`eai:acl`)
    Acl,
}

#[derive(Debug, Clone, Copy)]
pub struct SettingSpec {
    pub name: &'static str,
    pub kind: SettingKind,
    /// Raw default, coerced through `kind` when the process config is built
    pub default: Option<&'static str>,
    /// Whether a less specific stanza may fill this setting in during override merging
    pub inheritable: bool,
}

const fn spec(
    name: &'static str,
    kind: SettingKind,
    default: Option<&'static str>,
) -> SettingSpec {
    SettingSpec {
        name,
        kind,
        default,
        inheritable: true,
    }
}

const fn fixed(name: &'static str, kind: SettingKind, default: Option<&'static str>) -> SettingSpec {
    SettingSpec {
        name,
        kind,
        default,
        inheritable: false,
    }
}

pub const SAMPLE_TYPES: &[&str] = &["raw", "csv"];
pub const MODES: &[&str] = &["sample", "replay"];
pub const THREADING: &[&str] = &["thread", "process"];

pub const DEFAULT_BREAKER: &str = r"[^\r\n\s]+";
pub const DEFAULT_SPOOL_FILE: &str = "<SAMPLE>";

use SettingKind::{Acl, Bool, Choice, Count, Float, Int, Json, Seed, Text, Timezone};

/// Every setting a stanza may carry.
pub static SETTINGS: &[SettingSpec] = &[
    fixed("disabled", Bool, Some("false")),
    fixed("blacklist", Text, Some(r".*\.part")),
    fixed("eai:acl", Acl, None),
    spec("spoolDir", Text, Some("$SPLUNK_HOME/var/spool/splunk")),
    spec("spoolFile", Text, Some(DEFAULT_SPOOL_FILE)),
    spec("breaker", Text, Some(DEFAULT_BREAKER)),
    spec("sampletype", Choice(SAMPLE_TYPES), Some("raw")),
    spec("interval", Int, Some("60")),
    spec("delay", Float, Some("0")),
    spec("count", Count, Some("0")),
    spec("bundlelines", Bool, Some("false")),
    spec("earliest", Text, Some("now")),
    spec("latest", Text, Some("now")),
    spec("hourOfDayRate", Json, None),
    spec("dayOfWeekRate", Json, None),
    spec("minuteOfHourRate", Json, None),
    spec("dayOfMonthRate", Json, None),
    spec("monthOfYearRate", Json, None),
    spec("randomizeCount", Float, Some("0.2")),
    spec("randomizeEvents", Bool, Some("false")),
    spec("outputMode", Text, Some("spool")),
    spec("fileName", Text, None),
    spec("fileMaxBytes", Int, Some("10485760")),
    spec("fileBackupFiles", Int, Some("5")),
    spec("index", Text, Some("main")),
    spec("source", Text, Some("eventgen")),
    spec("sourcetype", Text, Some("eventgen")),
    spec("host", Text, Some("127.0.0.1")),
    spec("hostRegex", Text, None),
    spec("projectID", Text, None),
    spec("accessToken", Text, None),
    spec("mode", Choice(MODES), Some("sample")),
    spec("backfill", Text, None),
    spec("backfillSearch", Text, None),
    spec("eai:userName", Text, None),
    spec("eai:appName", Text, None),
    spec("timeMultiple", Float, Some("1")),
    spec("debug", Bool, Some("false")),
    spec("verbose", Bool, Some("false")),
    spec("timezone", Timezone, Some("local")),
    spec("perDayVolume", Float, None),
    spec("outputWorkers", Int, Some("1")),
    spec("generatorWorkers", Int, Some("1")),
    spec("generator", Text, Some("default")),
    spec("rater", Text, Some("config")),
    spec("timeField", Text, Some("_raw")),
    spec("sampleDir", Text, None),
    spec("threading", Choice(THREADING), Some("thread")),
    spec("profiler", Bool, Some("false")),
    spec("maxIntervalsBeforeFlush", Int, Some("3")),
    spec("maxQueueLength", Int, Some("0")),
    spec("useOutputQueue", Bool, Some("false")),
    spec("seed", Seed, None),
    spec("end", Text, None),
    spec("autotimestamps", Json, None),
    spec("autotimestamp", Bool, Some("false")),
];

pub fn lookup(name: &str) -> Option<&'static SettingSpec> {
    SETTINGS.iter().find(|s| s.name == name)
}

pub fn inheritable_settings() -> impl Iterator<Item = &'static SettingSpec> {
    SETTINGS.iter().filter(|s| s.inheritable)
}
