// debacu-client/tests/loader_integration.rs
// Loader behaviour against the in-memory data source

use std::sync::Arc;
use std::time::Duration;

use debacu_client::{
    ClientConfig, CustomerProfile, DataSource, InvoiceStatus, MemoryDataSource, NavigationContext,
    PlanCode, SubscriptionController, SubscriptionDataLoader, SubscriptionView, UrlLocation,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const PLAIN_URL: &str = "https://portal.example.com/cuenta?tab=plan";
const CHECKOUT_URL: &str = "https://portal.example.com/cuenta?tab=plan&session_id=cs_test_123";

fn customer(id: &str, name: &str, email: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "nif": "B12345678",
        "city": "Valencia",
        "email": email,
        "iban": "ES76 2077 0024 0031 0257 5766",
        "swift": "CVALESVVXXX",
        "bank_name": null,
    })
}

fn receipt(id: &str, customer_id: &str, date: &str, amount: Value, status: Value) -> Value {
    json!({
        "id": id,
        "customer_id": customer_id,
        "date": date,
        "amount": amount,
        "concept": "Cuota mensual",
        "status": status,
    })
}

fn plans() -> Vec<Value> {
    vec![
        json!({"id": "p-basic", "app_id": "DEBACU_EVAL", "name": "Basic", "code": "BASIC", "price_monthly": 29.9, "max_queries_per_month": 150}),
        json!({"id": "p-premium", "app_id": "DEBACU_EVAL", "name": "Premium", "code": "PREMIUM", "price_monthly": "79", "max_queries_per_month": 2500}),
        json!({"id": "p-foreign", "app_id": "OTHER_APP", "name": "Medium elsewhere", "code": "MEDIUM", "price_monthly": 1}),
    ]
}

fn seeded_source() -> Arc<MemoryDataSource> {
    let source = MemoryDataSource::new()
        .with_table(
            "customers",
            vec![
                customer("C1", "Hotel Sol", "c1@sol.es"),
                customer("C2", "Hostal Luna", "c2@luna.es"),
            ],
        )
        .with_table(
            "receipts",
            vec![
                receipt("r1", "C1", "2024-01-05", json!(30), json!("PAID")),
                receipt("r2", "C1", "2024-02-05", json!("30.00"), json!("PAID")),
                receipt("r3", "C1", "2024-03-05", json!("abc"), json!("PENDING")),
                receipt("r4", "C1", "2024-04-05", json!(50), json!(null)),
                receipt("r5", "C1", "2024-05-05", json!(50), json!("paid")),
                receipt("r6", "C1", "2024-06-05", json!(50), json!("PAID")),
                receipt("r7", "C1", "2023-12-05", json!(30), json!("PAID")),
                receipt("x1", "C2", "2024-06-01", json!(75), json!("PAID")),
            ],
        )
        .with_table("plans", plans());
    Arc::new(source)
}

fn loader_for(source: &Arc<MemoryDataSource>, view: &SubscriptionView) -> SubscriptionDataLoader {
    let source: Arc<dyn DataSource> = source.clone();
    SubscriptionDataLoader::new(source, view.clone(), &ClientConfig::default())
}

async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_load_merges_profile_bank_invoices_and_plans() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);

    loader.load("C1", &CancellationToken::new()).await;

    let state = view.snapshot();
    assert!(!state.loading);
    assert!(state.error.is_none());

    assert_eq!(state.profile.name, "Hotel Sol");
    assert_eq!(state.profile.nif, "B12345678");
    assert_eq!(state.profile.email, "c1@sol.es");
    assert_eq!(state.bank.iban, "ES76 2077 0024 0031 0257 5766");
    assert_eq!(state.bank.bank_name, "");

    let ids: Vec<&str> = state.invoices.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["r6", "r5", "r4", "r3", "r2"]);

    assert_eq!(state.plans.len(), 3);
    let codes: Vec<PlanCode> = state.plans.iter().map(|p| p.code).collect();
    assert_eq!(codes, vec![PlanCode::Basic, PlanCode::Medium, PlanCode::Premium]);
    assert_eq!(state.plans[0].id, "p-basic");
    assert_eq!(state.plans[0].price_monthly.to_string(), "29.9");
    // MEDIUM only exists for another app, so metadata fills in
    assert_eq!(state.plans[1].id, "MEDIUM");
    assert_eq!(state.plans[1].name, "Medio");
    assert_eq!(state.plans[1].price_monthly, Decimal::from(50));
    assert_eq!(state.plans[1].max_queries, 500);
    assert_eq!(state.plans[2].price_monthly, Decimal::from(79));
    assert_eq!(state.plans[2].max_queries, 2500);
}

#[tokio::test]
async fn test_invoice_status_and_amount_coercion() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    loader_for(&source, &view)
        .load("C1", &CancellationToken::new())
        .await;

    let invoices = view.invoices();
    let by_id = |id: &str| invoices.iter().find(|i| i.id == id).unwrap();

    assert_eq!(by_id("r6").status, InvoiceStatus::Paid);
    assert_eq!(by_id("r5").status, InvoiceStatus::Pending);
    assert_eq!(by_id("r4").status, InvoiceStatus::Pending);
    assert_eq!(by_id("r3").status, InvoiceStatus::Pending);
    assert_eq!(by_id("r3").amount, Decimal::ZERO);
    assert_eq!(by_id("r2").amount, Decimal::from(30));
    assert_eq!(by_id("r2").description, "Cuota mensual");
}

#[tokio::test]
async fn test_empty_catalog_falls_back_to_metadata() {
    let source = seeded_source();
    source.set_table("plans", Vec::new());
    let view = SubscriptionView::new();
    loader_for(&source, &view)
        .load("C1", &CancellationToken::new())
        .await;

    let plans = view.plans();
    assert_eq!(plans.len(), 3);
    for (plan, code) in plans.iter().zip(PlanCode::PAID) {
        assert_eq!(plan.code, code);
        assert_eq!(plan.id, code.as_str());
    }
    assert_eq!(plans[0].name, "Básico");
    assert_eq!(plans[0].price_monthly, Decimal::from(30));
    assert_eq!(plans[2].max_queries, 2000);
}

#[tokio::test]
async fn test_profile_merge_keeps_existing_email() {
    let source = seeded_source();
    source.set_table("customers", vec![json!({"id": "C1", "name": "Hotel Sol", "email": null})]);
    let view = SubscriptionView::with_profile(CustomerProfile::with_email("a@x.com"));

    loader_for(&source, &view)
        .load("C1", &CancellationToken::new())
        .await;

    let profile = view.profile();
    assert_eq!(profile.email, "a@x.com");
    assert_eq!(profile.name, "Hotel Sol");
}

#[tokio::test]
async fn test_missing_customer_row_leaves_profile_and_bank() {
    let source = seeded_source();
    let view = SubscriptionView::with_profile(CustomerProfile::with_email("a@x.com"));

    loader_for(&source, &view)
        .load("C404", &CancellationToken::new())
        .await;

    let state = view.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.profile, CustomerProfile::with_email("a@x.com"));
    assert_eq!(state.bank, Default::default());
    assert!(state.invoices.is_empty());
    assert_eq!(state.plans.len(), 3);
}

#[tokio::test]
async fn test_failed_read_reports_error_without_partial_merge() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);

    loader.load("C1", &CancellationToken::new()).await;
    let before = view.snapshot();

    source.set_table("customers", vec![customer("C1", "Renamed", "new@sol.es")]);
    source.fail_table("receipts", "connection reset");
    loader.load("C1", &CancellationToken::new()).await;

    let after = view.snapshot();
    assert!(!after.loading);
    assert_eq!(after.error.as_deref(), Some("Internal error: connection reset"));
    assert_eq!(after.profile, before.profile);
    assert_eq!(after.invoices, before.invoices);
    assert_eq!(after.plans, before.plans);

    source.clear_failure("receipts");
    loader.load("C1", &CancellationToken::new()).await;
    let recovered = view.snapshot();
    assert!(recovered.error.is_none());
    assert_eq!(recovered.profile.name, "Renamed");
}

#[tokio::test]
async fn test_reads_are_joined_not_raced() {
    let source = seeded_source();
    source.set_latency(Some(Duration::from_millis(100)));
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);

    let started = tokio::time::Instant::now();
    loader.load("C1", &CancellationToken::new()).await;

    assert_eq!(source.fetch_count("customers"), 1);
    assert_eq!(source.fetch_count("receipts"), 1);
    assert_eq!(source.fetch_count("plans"), 1);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(view.invoices().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_empty_customer_id_clears_loading_without_fetching() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    assert!(view.is_loading());
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(CHECKOUT_URL).unwrap();

    let activation = loader.activate(None, &mut location);
    assert!(!view.is_loading());
    assert!(activation.customer_id().is_none());

    let _activation = loader.activate(Some(""), &mut location);
    assert!(!view.is_loading());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetch_count("customers"), 0);
    assert_eq!(source.fetch_count("receipts"), 0);
    assert_eq!(source.fetch_count("plans"), 0);
    // nothing to load, so the checkout marker stays untouched
    assert!(location.has_param("session_id"));
}

#[tokio::test(start_paused = true)]
async fn test_checkout_marker_triggers_delayed_refetch() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(CHECKOUT_URL).unwrap();

    let activation = loader.activate(Some("C1"), &mut location);

    assert!(activation.retry_scheduled());
    assert!(!location.has_param("session_id"));
    assert!(location.has_param("tab"));
    assert_eq!(location.replacements(), 1);
    assert_eq!(location.navigations(), 0);

    settle().await;
    assert_eq!(source.fetch_count("customers"), 1);
    assert!(!view.is_loading());

    sleep(Duration::from_millis(2400)).await;
    assert_eq!(source.fetch_count("customers"), 1);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(source.fetch_count("customers"), 2);
    assert_eq!(source.fetch_count("receipts"), 2);
    assert_eq!(source.fetch_count("plans"), 2);
    assert!(!view.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_without_marker_loads_exactly_once() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(PLAIN_URL).unwrap();

    let activation = loader.activate(Some("C1"), &mut location);
    assert!(!activation.retry_scheduled());
    assert_eq!(location.replacements(), 0);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(source.fetch_count("customers"), 1);
    assert_eq!(view.profile().name, "Hotel Sol");
}

#[tokio::test(start_paused = true)]
async fn test_delayed_refetch_captures_settled_state() {
    let source = seeded_source();
    source.set_table("customers", vec![customer("C1", "Hotel Sol", "")]);
    source.set_table(
        "receipts",
        vec![receipt("old", "C1", "2024-01-01", json!(30), json!("PENDING"))],
    );
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(CHECKOUT_URL).unwrap();

    let _activation = loader.activate(Some("C1"), &mut location);
    settle().await;
    assert_eq!(view.profile().email, "");
    assert_eq!(view.invoices()[0].id, "old");

    // webhook settles between the two reads
    source.set_table("customers", vec![customer("C1", "Hotel Sol", "x@y.com")]);
    source.set_table(
        "receipts",
        vec![
            receipt("new-1", "C1", "2024-02-01", json!(30), json!("PAID")),
            receipt("new-2", "C1", "2024-02-02", json!(50), json!("PAID")),
        ],
    );

    sleep(Duration::from_millis(2500)).await;

    let state = view.snapshot();
    assert_eq!(state.profile.email, "x@y.com");
    let ids: Vec<&str> = state.invoices.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["new-2", "new-1"]);
    assert!(state.invoices.iter().all(|i| i.status == InvoiceStatus::Paid));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_refetch_fires_after_failed_first_pass() {
    let source = seeded_source();
    source.fail_table("customers", "service unavailable");
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(CHECKOUT_URL).unwrap();

    let _activation = loader.activate(Some("C1"), &mut location);
    settle().await;
    assert!(view.error().is_some());
    assert!(!view.is_loading());

    source.clear_failure("customers");
    sleep(Duration::from_millis(2500)).await;

    assert!(view.error().is_none());
    assert_eq!(view.profile().name, "Hotel Sol");
}

#[tokio::test(start_paused = true)]
async fn test_customer_change_cancels_pending_refetch() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let location = UrlLocation::parse(CHECKOUT_URL).unwrap();
    let mut controller = SubscriptionController::new(loader, location);

    controller.set_customer(Some("C1"));
    settle().await;
    assert_eq!(view.profile().name, "Hotel Sol");

    controller.set_customer(Some("C2"));
    settle().await;
    assert_eq!(view.profile().name, "Hostal Luna");

    sleep(Duration::from_secs(5)).await;

    // C1 initial + C2 initial; the C1 re-fetch never ran
    assert_eq!(source.fetch_count("customers"), 2);
    let state = view.snapshot();
    assert_eq!(state.profile.name, "Hostal Luna");
    assert_eq!(state.invoices.len(), 1);
    assert_eq!(state.invoices[0].id, "x1");
}

#[tokio::test(start_paused = true)]
async fn test_same_customer_does_not_reactivate() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut controller = SubscriptionController::new(loader, UrlLocation::parse(PLAIN_URL).unwrap());

    controller.set_customer(Some("C1"));
    controller.set_customer(Some("C1"));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(source.fetch_count("customers"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_in_flight_load_discards_results() {
    let source = seeded_source();
    source.set_latency(Some(Duration::from_millis(500)));
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(PLAIN_URL).unwrap();

    let activation = loader.activate(Some("C1"), &mut location);
    settle().await;
    assert!(view.is_loading());

    activation.cancel();
    assert!(activation.is_cancelled());
    sleep(Duration::from_secs(1)).await;

    let state = view.snapshot();
    assert_eq!(state.profile, CustomerProfile::default());
    assert!(state.invoices.is_empty());
    assert!(state.plans.is_empty());
    // the superseded load does not touch the flag either
    assert!(state.loading);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_activation_cancels_it() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(CHECKOUT_URL).unwrap();

    let activation = loader.activate(Some("C1"), &mut location);
    settle().await;
    drop(activation);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetch_count("customers"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_then_switch_customer() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut controller = SubscriptionController::new(loader, UrlLocation::parse(CHECKOUT_URL).unwrap());

    controller.set_customer(Some("C1"));
    controller.teardown();
    assert!(controller.activation().is_none());
    sleep(Duration::from_secs(5)).await;
    assert!(source.fetch_count("customers") <= 1);

    controller.set_customer(Some("C2"));
    settle().await;
    assert_eq!(view.profile().name, "Hostal Luna");
    assert!(!view.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_hung_fetch_keeps_loading() {
    let source = seeded_source();
    source.set_latency(Some(Duration::from_secs(3600)));
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(PLAIN_URL).unwrap();

    let _activation = loader.activate(Some("C1"), &mut location);
    sleep(Duration::from_secs(60)).await;

    assert!(view.is_loading());
    assert!(view.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_settled_waits_for_refetch() {
    let source = seeded_source();
    let view = SubscriptionView::new();
    let loader = loader_for(&source, &view);
    let mut location = UrlLocation::parse(CHECKOUT_URL).unwrap();

    let mut activation = loader.activate(Some("C1"), &mut location);
    activation.settled().await;

    assert_eq!(source.fetch_count("customers"), 2);
    assert!(!view.is_loading());
}

#[tokio::test]
async fn test_mistyped_receipt_cells_do_not_fail_the_cycle() {
    let source = seeded_source();
    source.set_table(
        "receipts",
        vec![
            json!({"id": 11, "customer_id": "C1", "date": "2024-03-01", "amount": 40, "concept": 7, "status": 1}),
            json!({"id": "r-ok", "customer_id": "C1", "date": "2024-02-01", "amount": [1], "concept": "", "status": "PAID"}),
            json!({"id": "r-odd", "customer_id": "C1", "date": 20240101, "amount": true, "concept": null, "status": {"v": "PAID"}}),
        ],
    );
    let view = SubscriptionView::new();
    loader_for(&source, &view)
        .load("C1", &CancellationToken::new())
        .await;

    let state = view.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.profile.name, "Hotel Sol");
    assert_eq!(state.plans.len(), 3);

    let ids: Vec<&str> = state.invoices.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["11", "r-ok", "r-odd"]);
    assert_eq!(state.invoices[0].status, InvoiceStatus::Pending);
    assert_eq!(state.invoices[0].description, "7");
    assert_eq!(state.invoices[1].status, InvoiceStatus::Paid);
    assert_eq!(state.invoices[1].amount, Decimal::ZERO);
    assert_eq!(state.invoices[1].description, "Factura");
    assert_eq!(state.invoices[2].status, InvoiceStatus::Pending);
    assert_eq!(state.invoices[2].amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_mistyped_plan_cells_do_not_fail_the_cycle() {
    let source = seeded_source();
    source.set_table(
        "plans",
        vec![
            json!({"id": 7, "app_id": "DEBACU_EVAL", "name": "Basic", "code": "BASIC", "price_monthly": "29", "max_queries_per_month": "150"}),
            json!({"id": "p-med", "app_id": "DEBACU_EVAL", "name": 500, "code": "MEDIUM", "price_monthly": 49, "max_queries_per_month": 450.0}),
            json!({"id": "p-prem", "app_id": "DEBACU_EVAL", "name": null, "code": "PREMIUM", "price_monthly": {}, "max_queries_per_month": null}),
        ],
    );
    let view = SubscriptionView::new();
    loader_for(&source, &view)
        .load("C1", &CancellationToken::new())
        .await;

    let state = view.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.invoices.len(), 5);

    let plans = &state.plans;
    assert_eq!(plans[0].id, "7");
    assert_eq!(plans[0].max_queries, 150);
    assert_eq!(plans[0].price_monthly, Decimal::from(29));
    assert_eq!(plans[1].name, "500");
    assert_eq!(plans[1].max_queries, 450);
    assert_eq!(plans[2].name, "Premium");
    assert_eq!(plans[2].price_monthly, Decimal::ZERO);
    assert_eq!(plans[2].max_queries, 2000);
}

#[tokio::test]
async fn test_mistyped_customer_cells_do_not_fail_the_cycle() {
    let source = seeded_source();
    source.set_table(
        "customers",
        vec![json!({
            "id": "C1",
            "name": "Hotel Sol",
            "postal_code": 46001,
            "phone": false,
            "email": ["c1@sol.es"],
            "iban": 12345,
        })],
    );
    let view = SubscriptionView::with_profile(CustomerProfile::with_email("a@x.com"));
    loader_for(&source, &view)
        .load("C1", &CancellationToken::new())
        .await;

    let state = view.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.profile.name, "Hotel Sol");
    assert_eq!(state.profile.postal_code, "46001");
    assert_eq!(state.profile.phone, "");
    assert_eq!(state.profile.email, "a@x.com");
    assert_eq!(state.bank.iban, "12345");
    assert_eq!(state.invoices.len(), 5);
}
