//! Integration tests for RfmForge

use rfmforge::{
    aggregate_customers, compute_rfm, export_scores, load_transactions, parse_reference_date, Metric,
    RfmError, Segment,
};
use chrono::{NaiveDate, TimeDelta};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "CustomerID,PurchaseDate,TransactionAmount,ProductInformation,OrderID,Location"
    )
    .unwrap();

    // Twelve customers with spread out recency, order counts and spend
    let rows = [
        (1001, "2023-06-28", 620.50, 5001),
        (1001, "2023-05-02", 310.00, 5002),
        (1001, "2023-04-11", 150.25, 5003),
        (1002, "2023-06-20", 80.00, 5004),
        (1003, "2023-03-15", 45.90, 5005),
        (1004, "2023-06-25", 940.00, 5006),
        (1004, "2023-06-01", 410.10, 5007),
        (1005, "2023-01-09", 12.00, 5008),
        (1006, "2023-05-30", 220.00, 5009),
        (1006, "2023-02-14", 75.00, 5010),
        (1007, "2023-06-10", 530.00, 5011),
        (1008, "2023-04-01", 33.00, 5012),
        (1009, "2023-06-29", 180.00, 5013),
        (1009, "2023-06-05", 60.00, 5014),
        (1009, "2023-05-21", 95.00, 5015),
        (1009, "2023-04-18", 40.00, 5016),
        (1010, "2023-02-27", 260.00, 5017),
        (1011, "2023-05-11", 18.50, 5018),
        (1012, "2023-06-15", 700.00, 5019),
        (1012, "2023-03-03", 90.00, 5020),
    ];
    for (customer, date, amount, order) in rows {
        writeln!(file, "{customer},{date},{amount},Product A,{order},London").unwrap();
    }

    // Refund-only customer, excluded from scoring
    writeln!(file, "1013,2023-06-30,-25.00,Product B,5021,Paris").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let file_path = test_file.path().to_str().unwrap();

    let transactions = load_transactions(file_path).unwrap();
    assert_eq!(transactions.len(), 21);

    let reference = parse_reference_date("2023-07-01").unwrap();
    let analysis = compute_rfm(&transactions, reference).unwrap();

    // Refund-only customer is dropped
    assert_eq!(analysis.customers.len(), 12);
    assert!(analysis.customers.iter().all(|c| c.customer_id != "1013"));
    assert!(analysis.customers.iter().all(|c| c.monetary > 0.0));

    for customer in &analysis.customers {
        for score in [customer.r_score, customer.f_score, customer.m_score] {
            assert!((1..=4).contains(&score));
        }
        assert_eq!(customer.rfm_score, customer.r_score + customer.f_score + customer.m_score);
        assert!((3..=12).contains(&customer.rfm_score));
        assert_eq!(customer.segment, Segment::from_score(customer.rfm_score));
    }

    assert_eq!(analysis.segment_counts.total(), analysis.customers.len());
}

#[test]
fn test_quartiles_are_balanced() {
    let test_file = create_test_csv();
    let transactions = load_transactions(test_file.path().to_str().unwrap()).unwrap();
    let reference = parse_reference_date("2023-07-01").unwrap();
    let analysis = compute_rfm(&transactions, reference).unwrap();

    let mut r_sizes = [0usize; 4];
    let mut f_sizes = [0usize; 4];
    let mut m_sizes = [0usize; 4];
    for customer in &analysis.customers {
        r_sizes[usize::from(customer.r_score) - 1] += 1;
        f_sizes[usize::from(customer.f_score) - 1] += 1;
        m_sizes[usize::from(customer.m_score) - 1] += 1;
    }

    // Twelve distinct values per metric split evenly
    assert_eq!(r_sizes, [3, 3, 3, 3]);
    assert_eq!(f_sizes, [3, 3, 3, 3]);
    assert_eq!(m_sizes, [3, 3, 3, 3]);
}

#[test]
fn test_reference_scenario_metrics() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CustomerID,OrderID,PurchaseDate,TransactionAmount").unwrap();
    writeln!(file, "C1,O1,2023-06-01,100").unwrap();
    writeln!(file, "C1,O2,2023-06-15,50").unwrap();
    writeln!(file, "C2,O3,2023-01-01,200").unwrap();
    writeln!(file, "C3,O4,2023-06-30,-5").unwrap();

    let transactions = load_transactions(file.path().to_str().unwrap()).unwrap();
    let reference = parse_reference_date("2023-07-01").unwrap();

    let metrics = aggregate_customers(&transactions, reference);
    let retained: Vec<_> = metrics.iter().filter(|m| m.monetary > 0.0).collect();
    assert_eq!(retained.len(), 2);

    assert_eq!(retained[0].customer_id, "C1");
    assert_eq!((retained[0].recency, retained[0].frequency), (16, 2));
    assert!((retained[0].monetary - 150.0).abs() < 1e-9);

    assert_eq!(retained[1].customer_id, "C2");
    assert_eq!((retained[1].recency, retained[1].frequency), (181, 1));
    assert!((retained[1].monetary - 200.0).abs() < 1e-9);

    // Two customers cannot fill four quartiles
    let err = compute_rfm(&transactions, reference).unwrap_err();
    assert!(matches!(err, RfmError::DegenerateDistribution { .. }));
}

/// Eight customers where only customer 1 lands in the top quartile of
/// Recency and the bottom quartiles of Frequency and Monetary
fn create_single_champion_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CustomerID,OrderID,PurchaseDate,TransactionAmount").unwrap();

    let reference = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
    // (customer, days since last purchase, orders, total spend)
    let customers = [
        (1, 70, 1, 100.0),
        (2, 80, 7, 700.0),
        (3, 50, 8, 200.0),
        (4, 60, 5, 300.0),
        (5, 30, 6, 800.0),
        (6, 40, 3, 400.0),
        (7, 10, 4, 500.0),
        (8, 20, 2, 600.0),
    ];
    for (customer, recency, orders, total) in customers {
        for order in 0..orders {
            let purchased = reference - TimeDelta::days(recency + order * 3);
            let amount = total / orders as f64;
            writeln!(file, "{customer},{customer}-{order},{},{amount}", purchased.format("%Y-%m-%d")).unwrap();
        }
    }

    file
}

#[test]
fn test_single_member_segment_correlation() {
    let test_file = create_single_champion_csv();
    let transactions = load_transactions(test_file.path().to_str().unwrap()).unwrap();
    let reference = parse_reference_date("2023-07-01").unwrap();
    let analysis = compute_rfm(&transactions, reference).unwrap();

    let champions = analysis.segment(Segment::Champions);
    assert_eq!(champions.len(), 1);
    assert_eq!(champions[0].customer_id, "1");
    assert_eq!(champions[0].score_code(), "444");
    assert_eq!(analysis.segment_counts.get(Segment::Champions), 1);

    let matrix = analysis.correlation(Segment::Champions);
    assert_eq!(matrix.sample_size, 1);
    assert!(matrix.is_undefined());
    assert_eq!(matrix.get(Metric::Recency, Metric::Monetary), None);

    // Customers 3, 4 and 6 share a score of 8
    let loyal = analysis.correlation(Segment::LoyalCustomers);
    assert_eq!(loyal.sample_size, 3);
    assert!(!loyal.is_undefined());
}

#[test]
fn test_export_scores() {
    let test_file = create_test_csv();
    let transactions = load_transactions(test_file.path().to_str().unwrap()).unwrap();
    let reference = parse_reference_date("2023-07-01").unwrap();
    let analysis = compute_rfm(&transactions, reference).unwrap();

    let temp_dir = tempdir().unwrap();
    let output_path = temp_dir.path().join("scores.csv");
    let output_str = output_path.to_str().unwrap();
    export_scores(&analysis.customers, output_str).unwrap();

    let written = std::fs::read_to_string(&output_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("CustomerID,Recency,Frequency,Monetary,R_Score,F_Score,M_Score,RFM_Score,RFM_Segment,RFM_Code")
    );
    assert_eq!(lines.count(), analysis.customers.len());
}

#[test]
fn test_error_handling_missing_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CustomerID,OrderID,TransactionAmount").unwrap();
    writeln!(file, "1,10,5.0").unwrap();

    let err = load_transactions(file.path().to_str().unwrap()).unwrap_err();
    match err {
        RfmError::MissingColumn { column } => assert_eq!(column, "PurchaseDate"),
        other => panic!("unexpected error: {other}"),
    }
}
