use hashjoin::{hash_join, BoundedTable, JoinConfig, JoinStats, Result};
use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// Reader whose every read fails, standing in for a faulty input stream.
struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk read failed"))
    }
}

impl BufRead for FailingReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Err(io::Error::new(io::ErrorKind::Other, "disk read failed"))
    }

    fn consume(&mut self, _amt: usize) {}
}

impl Seek for FailingReader {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Ok(0)
    }
}

fn run(build: &str, probe: &str, config: &JoinConfig) -> (Result<JoinStats>, String) {
    let mut out = Vec::new();
    let result = hash_join(Cursor::new(build), Cursor::new(probe), &mut out, config);
    (result, String::from_utf8(out).unwrap())
}

/// Budget that comfortably fits `entries` table entries.
fn budget_for(entries: usize) -> usize {
    BoundedTable::entry_size() * entries
}

#[test]
fn test_inner_join_worked_example() {
    let config = JoinConfig::default();
    let (result, out) = run("1,Alice\n2,Bob\n", "1,Eng\n1,Ops\n3,HR\n", &config);
    let stats = result.unwrap();

    assert_eq!(out, "1,Alice,Eng\n1,Alice,Ops\n");
    assert_eq!(stats.passes, 1);
    assert_eq!(stats.rows_emitted, 2);
}

#[test]
fn test_last_write_wins_within_pass() {
    let config = JoinConfig::default();
    let (result, out) = run("1,Alice\n1,Mallory\n2,Bob\n", "1,Eng\n2,Ops\n", &config);
    result.unwrap();

    // Only the later build record for key 1 may appear, and only once.
    assert_eq!(out, "1,Mallory,Eng\n2,Bob,Ops\n");
}

#[test]
fn test_duplicate_probe_rows_each_emit() {
    let config = JoinConfig::default();
    let (result, out) = run("7,x\n", "7,a\n7,b\n7,c\n", &config);
    let stats = result.unwrap();

    assert_eq!(out, "7,x,a\n7,x,b\n7,x,c\n");
    assert_eq!(stats.rows_emitted, 3);
}

#[test]
fn test_pass_count_law() {
    // 20 unique build keys, capacity 8 => chunk size floor(8 * 0.75) = 6,
    // so ceil(20 / 6) = 4 passes and 4 full probe scans.
    let build: String = (0..20).map(|i| format!("k{},v{}\n", i, i)).collect();
    let probe: String = (0..20).map(|i| format!("k{},p{}\n", i, i)).collect();
    let config = JoinConfig {
        memory_budget: budget_for(8),
        ..JoinConfig::default()
    };

    let (result, out) = run(&build, &probe, &config);
    let stats = result.unwrap();

    assert_eq!(stats.passes, 4);
    assert_eq!(stats.build_records, 20);
    assert_eq!(stats.probe_records_scanned, 4 * 20);
    assert_eq!(stats.rows_emitted, 20);
    assert_eq!(out.lines().count(), 20);
}

#[test]
fn test_output_ordered_by_pass_then_probe() {
    // One entry per pass: probe order is 4,3,2,1 but output follows
    // build-chunk order across passes.
    let config = JoinConfig {
        memory_budget: budget_for(1),
        first_row_guard: false,
        ..JoinConfig::default()
    };
    let (result, out) = run(
        "1,w\n2,x\n3,y\n4,z\n",
        "4,d\n3,c\n2,b\n1,a\n",
        &config,
    );
    let stats = result.unwrap();

    assert_eq!(stats.passes, 4);
    assert_eq!(out, "1,w,a\n2,x,b\n3,y,c\n4,z,d\n");
}

#[test]
fn test_duplicate_build_keys_across_passes_each_match() {
    // With one entry per pass, the duplicate key lands in its own pass and
    // the probe row matches once per pass holding it.
    let config = JoinConfig {
        memory_budget: budget_for(1),
        ..JoinConfig::default()
    };
    let (result, out) = run("1,old\n1,new\n", "1,p\n", &config);
    let stats = result.unwrap();

    assert_eq!(stats.passes, 2);
    assert_eq!(out, "1,old,p\n1,new,p\n");
}

#[test]
fn test_budget_below_one_entry() {
    let config = JoinConfig {
        memory_budget: BoundedTable::entry_size() - 1,
        ..JoinConfig::default()
    };
    let (result, out) = run("1,a\n", "1,b\n", &config);
    let err = result.unwrap_err();

    assert_eq!(err.exit_code(), 8);
    assert!(out.is_empty());
}

#[test]
fn test_empty_probe_input() {
    let config = JoinConfig::default();
    let (result, out) = run("1,a\n", "", &config);
    let err = result.unwrap_err();

    assert_eq!(err.exit_code(), 5);
    assert!(out.is_empty());
}

#[test]
fn test_empty_build_input() {
    let config = JoinConfig::default();
    let (result, _) = run("", "1,b\n", &config);
    assert_eq!(result.unwrap_err().exit_code(), 5);
}

#[test]
fn test_blank_leading_line_counts_as_no_data() {
    let config = JoinConfig::default();
    let (result, _) = run("\n1,a\n", "1,b\n", &config);
    assert_eq!(result.unwrap_err().exit_code(), 5);
}

#[test]
fn test_first_row_content_mismatch() {
    let config = JoinConfig::default();
    let (result, out) = run("1,Alice\n", "x1,Eng\n1,Ops\n", &config);
    let err = result.unwrap_err();

    assert_eq!(err.exit_code(), 7);
    assert!(out.is_empty());
}

#[test]
fn test_first_row_guard_can_be_disabled() {
    let config = JoinConfig {
        first_row_guard: false,
        ..JoinConfig::default()
    };
    let (result, out) = run("1,Alice\n", "x1,Eng\n1,Ops\n", &config);
    result.unwrap();
    assert_eq!(out, "1,Alice,Ops\n");
}

#[test]
fn test_unresolvable_join_column() {
    let config = JoinConfig {
        build_column: 5,
        ..JoinConfig::default()
    };
    let (result, _) = run("1,a\n", "1,b\n", &config);
    assert_eq!(result.unwrap_err().exit_code(), 6);
}

#[test]
fn test_ragged_record_mid_stream() {
    // The join column resolves on the first records but not on the short
    // third build record.
    let config = JoinConfig {
        build_column: 1,
        probe_column: 1,
        ..JoinConfig::default()
    };
    let (result, _) = run("a,1\nb,2\nc\n", "x,1\n", &config);
    assert_eq!(result.unwrap_err().exit_code(), 2);
}

#[test]
fn test_ragged_record_mid_probe_scan() {
    // Same failure on the probe side: the join column resolves on the
    // first record pair, then the second probe record is too short.
    let config = JoinConfig {
        build_column: 1,
        probe_column: 1,
        ..JoinConfig::default()
    };
    let (result, _) = run("a,1\n", "x,1\ny\n", &config);
    assert_eq!(result.unwrap_err().exit_code(), 2);
}

#[test]
fn test_read_error_maps_to_status_4() {
    let config = JoinConfig::default();
    let mut out = Vec::new();

    let result = hash_join(Cursor::new("1,a\n"), FailingReader, &mut out, &config);
    assert_eq!(result.unwrap_err().exit_code(), 4);
    assert!(out.is_empty());

    let result = hash_join(FailingReader, Cursor::new("1,b\n"), &mut out, &config);
    assert_eq!(result.unwrap_err().exit_code(), 4);
    assert!(out.is_empty());
}

#[test]
fn test_overlong_record_rejected() {
    let config = JoinConfig {
        max_record_len: 8,
        ..JoinConfig::default()
    };
    let (result, _) = run("1,a\n", "1,bbbbbbbbbbbb\n", &config);
    assert_eq!(result.unwrap_err().exit_code(), 3);
}

#[test]
fn test_join_on_last_probe_field_leaves_no_trailing_delimiter() {
    let config = JoinConfig {
        build_column: 0,
        probe_column: 1,
        ..JoinConfig::default()
    };
    let (result, out) = run("1,Alice\n", "Eng,1\nOps,1\n", &config);
    result.unwrap();
    assert_eq!(out, "1,Alice,Eng\n1,Alice,Ops\n");
}

#[test]
fn test_semicolon_delimiter() {
    let config = JoinConfig {
        delimiter: ';',
        ..JoinConfig::default()
    };
    let (result, out) = run("1;Alice\n", "1;Eng\n", &config);
    result.unwrap();
    assert_eq!(out, "1;Alice;Eng\n");
}

#[test]
fn test_multi_pass_against_single_pass() {
    // The same inputs must produce the same row set regardless of how many
    // passes the budget forces; only ordering may differ.
    let build: String = (0..30).map(|i| format!("k{},b{}\n", i, i)).collect();
    let probe: String = (0..60).map(|i| format!("k{},p{}\n", i % 40, i)).collect();

    let single = JoinConfig {
        memory_budget: budget_for(100),
        ..JoinConfig::default()
    };
    let (result, single_out) = run(&build, &probe, &single);
    let single_stats = result.unwrap();
    assert_eq!(single_stats.passes, 1);

    let multi = JoinConfig {
        memory_budget: budget_for(4),
        ..JoinConfig::default()
    };
    let (result, multi_out) = run(&build, &probe, &multi);
    let multi_stats = result.unwrap();
    assert!(multi_stats.passes > 1);

    let mut single_rows: Vec<&str> = single_out.lines().collect();
    let mut multi_rows: Vec<&str> = multi_out.lines().collect();
    single_rows.sort_unstable();
    multi_rows.sort_unstable();
    assert_eq!(single_rows, multi_rows);
    assert_eq!(single_stats.rows_emitted, multi_stats.rows_emitted);
}

#[test]
fn test_file_backed_join() -> std::io::Result<()> {
    let mut build = NamedTempFile::new()?;
    writeln!(build, "1,Alice")?;
    writeln!(build, "2,Bob")?;
    let mut probe = NamedTempFile::new()?;
    writeln!(probe, "1,Eng")?;
    writeln!(probe, "1,Ops")?;
    writeln!(probe, "3,HR")?;
    build.flush()?;
    probe.flush()?;

    let config = JoinConfig::default();
    let mut out = Vec::new();
    let stats = hash_join(
        std::io::BufReader::new(build.reopen()?),
        std::io::BufReader::new(probe.reopen()?),
        &mut out,
        &config,
    )
    .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "1,Alice,Eng\n1,Alice,Ops\n");
    assert_eq!(stats.rows_emitted, 2);
    Ok(())
}
