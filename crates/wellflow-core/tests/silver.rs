use polars::prelude::*;

use wellflow_core::{BronzePipeline, PipelineError, PipelineOptions, SilverPipeline};

fn serialized(df: &DataFrame) -> DataFrame {
    BronzePipeline::new(["serialize_rows", "add_id"], PipelineOptions::new())
        .unwrap()
        .run(df)
        .unwrap()
}

fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

#[test]
fn parse_json_recovers_serialized_columns() {
    let original = df![
        "name" => &["Alice Amore", "Bob Bogart"],
        "age" => &[5i64, 7],
        "depth" => &[Some(1.5f64), None],
    ]
    .unwrap();
    let bronze = serialized(&original);

    let silver = SilverPipeline::new(["parse_json"], PipelineOptions::new())
        .unwrap()
        .run(&bronze)
        .unwrap();

    assert_eq!(silver.get_column_names(), vec!["id", "name", "age", "depth"]);
    let recovered = silver.select(["name", "age", "depth"]).unwrap();
    assert!(recovered.equals_missing(&original));
}

#[test]
fn parse_json_flattens_nested_objects() {
    let bronze = df![
        "source_row" => &[r#"{"well": {"api10": "4200000001", "depth": 3}}"#],
    ]
    .unwrap();

    let silver = SilverPipeline::new(["parse_json"], PipelineOptions::new())
        .unwrap()
        .run(&bronze)
        .unwrap();

    assert_eq!(silver.get_column_names(), vec!["well.api10", "well.depth"]);
}

#[test]
fn parse_json_reports_malformed_rows() {
    let bronze = df!["source_row" => &[r#"{"a": 1}"#, "not json"]].unwrap();
    let pipeline = SilverPipeline::new(["parse_json"], PipelineOptions::new()).unwrap();
    assert!(matches!(
        pipeline.run(&bronze).unwrap_err(),
        PipelineError::MalformedRow { row: 1, .. }
    ));

    let bronze = df!["source_row" => &["[1, 2]"]].unwrap();
    assert!(matches!(
        pipeline.run(&bronze).unwrap_err(),
        PipelineError::MalformedRow { row: 0, .. }
    ));
}

#[test]
fn parse_json_requires_source_row() {
    let pipeline = SilverPipeline::new(["parse_json"], PipelineOptions::new()).unwrap();
    let err = pipeline.run(&df!["id" => &["x"]].unwrap()).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumns { ref missing, .. } if missing == &["source_row"]));
}

#[test]
fn filter_missing_drops_empty_strings_and_nulls() {
    let df = df!["x" => &[""], "y" => &["kept"]].unwrap();
    let options = PipelineOptions::new().with("cols_to_filter_missing", vec!["x"]);
    let out = SilverPipeline::new(["filter_missing"], options)
        .unwrap()
        .run(&df)
        .unwrap();
    assert_eq!(out.height(), 0);

    let df = df![
        "x" => &[Some("a"), None, Some("c"), Some("")],
        "n" => &[Some(1i64), Some(2), None, Some(4)],
    ]
    .unwrap();
    let options = PipelineOptions::new().with("cols_to_filter_missing", vec!["x", "n"]);
    let out = SilverPipeline::new(["filter_missing"], options)
        .unwrap()
        .run(&df)
        .unwrap();
    assert_eq!(strings(&out, "x"), vec![Some("a".to_string())]);
}

#[test]
fn filter_missing_rejects_unknown_columns() {
    let df = df!["x" => &["a"]].unwrap();
    let options = PipelineOptions::new().with("cols_to_filter_missing", vec!["x", "nope"]);
    let err = SilverPipeline::new(["filter_missing"], options)
        .unwrap()
        .run(&df)
        .unwrap_err();
    match err {
        PipelineError::MissingColumns { step, missing } => {
            assert_eq!(step, "filter_missing");
            assert_eq!(missing, vec!["nope".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn eliminate_invalid_values_normalizes_each_column() {
    let df = df![
        "direction" => &["Horizontal", "horizontal", "VERTICAL", "invalid", ""],
        "spuddate" => &["2023-07-01", "2033-07-01", "invalid", "", "2020-01-31"],
        "cum12moil" => &["44697", "-1", "abc", "0", ""],
    ]
    .unwrap();
    let options = PipelineOptions::new().with(
        "cols_to_elim_invalid_values",
        vec!["direction", "spuddate", "cum12moil"],
    );

    let out = SilverPipeline::new(["eliminate_invalid_values"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    assert_eq!(
        strings(&out, "direction"),
        vec![
            Some("HORIZONTAL".to_string()),
            Some("HORIZONTAL".to_string()),
            Some("VERTICAL".to_string()),
            None,
            None,
        ]
    );

    let spuddate = out.column("spuddate").unwrap();
    assert_eq!(spuddate.dtype(), &DataType::Date);
    let as_text = spuddate.cast(&DataType::String).unwrap();
    let as_text: Vec<Option<&str>> = as_text.str().unwrap().into_iter().collect();
    assert_eq!(
        as_text,
        vec![Some("2023-07-01"), None, None, None, Some("2020-01-31")]
    );

    let oil: Vec<Option<i64>> = out
        .column("cum12moil")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(oil, vec![Some(44697), None, None, Some(0), None]);
}

#[test]
fn unmapped_elimination_column_fails_at_construction() {
    let options = PipelineOptions::new().with("cols_to_elim_invalid_values", vec!["api10"]);
    let err = SilverPipeline::new(["eliminate_invalid_values"], options).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[test]
fn mean_imputation_fills_with_the_average() {
    let df = df![
        "A" => &[Some(1i64), Some(2), None, Some(6)],
        "B" => &[Some(7.0f64), None, Some(7.0), None],
    ]
    .unwrap();
    let options = PipelineOptions::new().with("cols_to_impute_with_mean", vec!["A", "B"]);

    let out = SilverPipeline::new(["impute_with_mean"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    let a: Vec<Option<f64>> = out.column("A").unwrap().f64().unwrap().into_iter().collect();
    assert_eq!(a, vec![Some(1.0), Some(2.0), Some(3.0), Some(6.0)]);
    let b: Vec<Option<f64>> = out.column("B").unwrap().f64().unwrap().into_iter().collect();
    assert_eq!(b, vec![Some(7.0); 4]);
}

#[test]
fn mean_imputation_keeps_dates_as_dates() {
    let spuddate = Series::new("spuddate".into(), &[Some(10i32), None, Some(20)])
        .cast(&DataType::Date)
        .unwrap();
    let df = DataFrame::new(vec![spuddate.into()]).unwrap();
    let options = PipelineOptions::new().with("cols_to_impute_with_mean", vec!["spuddate"]);

    let out = SilverPipeline::new(["impute_with_mean"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    let spuddate = out.column("spuddate").unwrap();
    assert_eq!(spuddate.dtype(), &DataType::Date);
    let physical = spuddate.cast(&DataType::Int32).unwrap();
    let physical: Vec<Option<i32>> = physical.i32().unwrap().into_iter().collect();
    assert_eq!(physical, vec![Some(10), Some(15), Some(20)]);
}

#[test]
fn mean_imputation_rejects_text_columns() {
    let df = df!["county" => &[Some("pecos"), None]].unwrap();
    let options = PipelineOptions::new().with("cols_to_impute_with_mean", vec!["county"]);
    let err = SilverPipeline::new(["impute_with_mean"], options)
        .unwrap()
        .run(&df)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[test]
fn mode_imputation_prefers_the_first_of_tied_values() {
    let df = df![
        "A" => &[Some("1"), Some("2"), Some("1"), Some("2"), Some("1"), Some("2"), Some("3"), None],
    ]
    .unwrap();
    let options = PipelineOptions::new().with("cols_to_impute_with_mode", vec!["A"]);

    let out = SilverPipeline::new(["impute_with_mode"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    assert_eq!(strings(&out, "A")[7], Some("1".to_string()));
    assert_eq!(out.column("A").unwrap().null_count(), 0);
}

#[test]
fn mode_imputation_keeps_integer_dtype() {
    let df = df!["n" => &[Some(4i64), None, Some(4), Some(9)]].unwrap();
    let options = PipelineOptions::new().with("cols_to_impute_with_mode", vec!["n"]);

    let out = SilverPipeline::new(["impute_with_mode"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    let n: Vec<Option<i64>> = out.column("n").unwrap().i64().unwrap().into_iter().collect();
    assert_eq!(n, vec![Some(4), Some(4), Some(4), Some(9)]);
}

#[test]
fn imputation_over_all_null_columns_leaves_nulls() {
    let df = df![
        "a" => &[None::<f64>, None],
        "b" => &[None::<&str>, None],
    ]
    .unwrap();
    let options = PipelineOptions::new()
        .with("cols_to_impute_with_mean", vec!["a"])
        .with("cols_to_impute_with_mode", vec!["b"]);

    let out = SilverPipeline::new(["impute_with_mean", "impute_with_mode"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    assert_eq!(out.column("a").unwrap().null_count(), 2);
    assert_eq!(out.column("b").unwrap().null_count(), 2);
}

#[test]
fn sort_is_stable_with_nulls_last() {
    let df = df![
        "api10" => &[Some("3"), None, Some("1"), Some("3")],
        "tag" => &["first", "null", "one", "second"],
    ]
    .unwrap();
    let options = PipelineOptions::new().with("cols_to_sort_by", vec!["api10"]);

    let out = SilverPipeline::new(["sort"], options)
        .unwrap()
        .run(&df)
        .unwrap();

    assert_eq!(
        strings(&out, "tag"),
        ["one", "first", "second", "null"]
            .map(|s| Some(s.to_string()))
            .to_vec()
    );
}
