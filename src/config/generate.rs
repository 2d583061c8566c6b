pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# SAMPLEGEN STANZA CONFIGURATION
# =============================================================================
# Each top-level key is a stanza. A stanza name is a regular expression
# matched against the file names in the sample directory; every matching file
# becomes one sample. When several stanzas match the same file, the most
# specific one (an exact name, then the longest pattern) wins and inherits
# any setting it leaves unset from the others.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/samplegen/eventgen.yml
#   3. /etc/samplegen/eventgen.yml
#
# Samples are looked up in 'sampleDir' if set, otherwise in 'samples/' next
# to this file, then in 'samples/' under the working directory.

# =============================================================================
# GLOBAL (reserved)
# =============================================================================
# Settings here become the defaults for every stanza below.

global:
  interval: 60
  earliest: -60s
  latest: now
  outputMode: file
  fileName: /tmp/samplegen.log
  fileMaxBytes: 10485760
  fileBackupFiles: 5

# =============================================================================
# SAMPLES
# =============================================================================

# Wildcard stanza: applies to every file starting with 'web'
web.*:
  # Owning app; injected from --app or the config directory when omitted
  eai:acl: {app: demo}
  count: 10
  randomizeEvents: true
  # Fit known timestamp formats to the sample and add tokens for them
  autotimestamp: true

  # Tokens are numbered; each needs token, replacementType and replacement
  token.0.token: 'client=(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})'
  token.0.replacementType: random
  token.0.replacement: ipv4

  token.1.token: 'bytes=(\d+)'
  token.1.replacementType: random
  token.1.replacement: integer[100:65535]

# Exact stanza: wins over 'web.*' for web-access.log, inheriting its count
web-access\.log:
  eai:acl: {app: demo}
  sourcetype: access_combined
  # Rate tables are JSON; YAML mappings are accepted as well
  hourOfDayRate: {"0": 0.3, "8": 0.8, "12": 1.0, "18": 0.6}

  # 'file' picks whole lines, 'mvfile' picks a column (path:column)
  token.0.token: 'user=(\w+)'
  token.0.replacementType: mvfile
  token.0.replacement: samples/users.csv:1

# Multi-line events split on a custom breaker
app\.log:
  eai:acl: {app: demo}
  breaker: '^\d{4}-\d{2}-\d{2}'
  token.0.token: '\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}'
  token.0.replacementType: timestamp
  token.0.replacement: '%Y-%m-%d %H:%M:%S'

# Replay keeps the recorded spacing between events
replay\.csv:
  eai:acl: {app: demo}
  sampletype: csv
  mode: replay
  disabled: true
"#
    .to_string()
}
