use scanseed_core::profile::{DatabaseProfile, FieldProfile, FieldType, TableProfile};

/// A small clinical source: identifiers are truncated in the scan, and a
/// `death` table carries a full sample of `person_id` values for the key pool.
pub fn clinical_profile() -> DatabaseProfile {
    let person = TableProfile::new("person")
        .with_field(FieldProfile::truncated("person_id", FieldType::Integer, 8))
        .with_field(
            FieldProfile::new("gender_concept_id", FieldType::Integer, 4)
                .with_counts(&[("8507", "510"), ("8532", "490")]),
        )
        .with_field(
            FieldProfile::new("year_of_birth", FieldType::Integer, 4)
                .with_counts(&[("1950", "30"), ("1968", "45"), ("1981", "25")]),
        )
        .with_field(
            FieldProfile::new("gender_source_value", FieldType::VarChar, 1)
                .with_counts(&[("M", "510"), ("F", "490")]),
        )
        .with_field(FieldProfile::truncated("birth_datetime", FieldType::Date, 10));

    let visit = TableProfile::new("visit_occurrence")
        .with_field(FieldProfile::truncated("visit_occurrence_id", FieldType::Integer, 10))
        .with_field(FieldProfile::truncated("person_id", FieldType::Integer, 8))
        .with_field(
            FieldProfile::new("visit_concept_id", FieldType::Integer, 4)
                .with_counts(&[("9201", "120"), ("9202", "700"), ("9203", "180")]),
        )
        .with_field(
            FieldProfile::new("visit_start_date", FieldType::Date, 10)
                .with_counts(&[("2019-03-01", "4"), ("2019-03-02", "6")]),
        )
        .with_field(FieldProfile::truncated("visit_source_value", FieldType::VarChar, 12));

    let death = TableProfile::new("death")
        .with_field(
            FieldProfile::new("person_id", FieldType::Integer, 8)
                .with_counts(&[("1001", "1"), ("1002", "1"), ("1003", "1"), ("1004", "1")]),
        )
        .with_field(
            FieldProfile::new("cause_source_value", FieldType::VarChar, 5)
                .with_counts(&[("I21", "3"), ("", "1")]),
        );

    DatabaseProfile::new(vec![person, visit, death]).expect("clinical fixture is valid")
}

/// Table `A` has a truncated `patient_id`; table `B` profiles it as P1×5, P2×3.
pub fn patient_scenario() -> DatabaseProfile {
    DatabaseProfile::new(vec![
        TableProfile::new("A").with_field(FieldProfile::truncated("patient_id", FieldType::VarChar, 10)),
        TableProfile::new("B").with_field(
            FieldProfile::new("patient_id", FieldType::VarChar, 2).with_counts(&[("P1", "5"), ("P2", "3")]),
        ),
    ])
    .expect("patient fixture is valid")
}

/// One `gender` field profiled as M×2, F×1.
pub fn weighted_scenario() -> DatabaseProfile {
    DatabaseProfile::new(vec![TableProfile::new("person").with_field(
        FieldProfile::new("gender", FieldType::VarChar, 1).with_counts(&[("M", "2"), ("F", "1")]),
    )])
    .expect("weighted fixture is valid")
}

/// A table with a declared type no mapper knows.
pub fn frobnicate_table() -> TableProfile {
    TableProfile::new("gadgets")
        .with_field(FieldProfile::new("gadget_id", FieldType::Integer, 8).with_counts(&[("1", "1")]))
        .with_field(
            FieldProfile::new("flux", FieldType::Other("Frobnicate".to_string()), 4)
                .with_counts(&[("on", "1")]),
        )
}

/// A table whose only sample has a non-numeric frequency.
pub fn malformed_table() -> TableProfile {
    TableProfile::new("broken").with_field(
        FieldProfile::new("status", FieldType::VarChar, 8).with_counts(&[("active", "abc")]),
    )
}

/// The clinical fixture plus one unmappable and one malformed table.
pub fn mixed_profile() -> DatabaseProfile {
    let mut tables = clinical_profile().tables;
    tables.push(frobnicate_table());
    tables.push(malformed_table());
    DatabaseProfile::new(tables).expect("mixed fixture is valid")
}

/// A profile document as the loader reads it from disk.
pub fn profile_json() -> &'static str {
    r#"{
  "tables": [
    {
      "name": "person",
      "fields": [
        { "name": "person_id", "type": "Integer", "max_length": 8,
          "value_counts": [["List truncated...", ""]] },
        { "name": "gender", "type": "VarChar", "max_length": 1,
          "value_counts": [["M", 510], ["F", "490"]] }
      ]
    },
    {
      "name": "death",
      "fields": [
        { "name": "person_id", "type": "int", "max_length": 8,
          "value_counts": [["7", 1], ["9", 1], ["List truncated...", ""]] }
      ]
    }
  ]
}"#
}
