use price_tracker::catalog::{Category, MemoryCatalog};
use price_tracker::pipeline::{run, CategoryOutcome, ScrapeSettings};
use price_tracker::{ListingSelectors, StoreError, Url};
use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing(title: &str, href: &str, price: &str) -> String {
    format!(
        r#"<li class="productListContent-item">
             <a class="product-link" href="{href}"><h3 class="product-title">{title}</h3></a>
             <div class="price-value">{price}</div>
           </li>"#
    )
}

fn page(items: &[String]) -> String {
    format!("<html><body><ul>{}</ul></body></html>", items.concat())
}

async fn serve(server: &MockServer, slug: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/{slug}")))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn settings(server: &MockServer) -> ScrapeSettings {
    ScrapeSettings {
        site_url: Url::parse(&server.uri()).unwrap(),
        request_timeout: None,
        selectors: ListingSelectors::default(),
    }
}

#[tokio::test]
async fn categories_fail_independently() {
    let server = MockServer::start().await;
    serve(
        &server,
        "phones",
        200,
        page(&[
            listing("Phone A", "/phone-a", "10.999,00 TL"),
            listing("Phone B", "/phone-b", "fiyat yok"),
            listing("Phone C", "/phone-c", "7.499,50 TL"),
        ]),
    )
    .await;
    serve(&server, "laptops", 503, String::new()).await;
    serve(
        &server,
        "kettles",
        200,
        page(&[
            listing("Kettle A", "/kettle-a", "349,99 TL"),
            listing("Kettle B", "/kettle-b", "599 TL"),
        ]),
    )
    .await;

    let catalog = MemoryCatalog::with_categories([
        Category::active("phones"),
        Category::active("laptops"),
        Category::active("kettles"),
        Category {
            slug: "archived".into(),
            status: "inactive".into(),
        },
    ]);
    catalog.reject_slug("kettle-b");

    let report = run(&catalog, &settings(&server)).await.unwrap();

    assert_eq!(report.categories.len(), 3);
    assert!(report.category("archived").is_none());
    assert_eq!((report.succeeded(), report.failed()), (1, 2));

    let phones = report.category("phones").unwrap();
    assert_eq!(phones.rejected_listings, 1);
    match phones.outcome {
        CategoryOutcome::Reconciled(summary) => assert_eq!(summary.inserted, 2),
        ref other => panic!("phones should reconcile, got {other:?}"),
    }
    assert_eq!(
        catalog.product("phone-a").unwrap().price,
        Decimal::new(1099900, 2)
    );
    assert_eq!(
        catalog.product("phone-c").unwrap().lowest_price,
        Some(Decimal::new(749950, 2))
    );
    assert!(catalog.product("phone-b").is_none());

    assert!(matches!(
        report.category("laptops").unwrap().outcome,
        CategoryOutcome::FetchFailed(_)
    ));
    assert!(matches!(
        report.category("kettles").unwrap().outcome,
        CategoryOutcome::PersistFailed(StoreError::Constraint(_))
    ));
    assert!(catalog.product("kettle-a").is_none());

    assert_eq!(catalog.products().len(), 2);
}

#[tokio::test]
async fn second_pass_records_only_price_changes() {
    let server = MockServer::start().await;
    Mock::given(path("/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[
            listing("Widget 1", "/widget-1", "100,00 TL"),
            listing("Widget 2", "/widget-2", "50,00 TL"),
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[
            listing("Widget 1", "/widget-1", "90,00 TL"),
            listing("Widget 2", "/widget-2", "50 TL"),
        ])))
        .mount(&server)
        .await;

    let catalog = MemoryCatalog::with_categories([Category::active("widgets")]);
    let settings = settings(&server);

    run(&catalog, &settings).await.unwrap();
    let report = run(&catalog, &settings).await.unwrap();

    match report.category("widgets").unwrap().outcome {
        CategoryOutcome::Reconciled(summary) => {
            assert_eq!((summary.inserted, summary.updated, summary.unchanged), (0, 1, 1))
        }
        ref other => panic!("widgets should reconcile, got {other:?}"),
    }

    let widget_1 = catalog.product("widget-1").unwrap();
    assert_eq!(widget_1.price, Decimal::new(9000, 2));
    assert_eq!(widget_1.lowest_price, Some(Decimal::new(9000, 2)));
    assert_eq!(catalog.history(widget_1.id).len(), 2);

    let widget_2 = catalog.product("widget-2").unwrap();
    assert_eq!(catalog.history(widget_2.id).len(), 1);
}

#[tokio::test]
async fn no_active_categories_is_an_empty_pass() {
    let server = MockServer::start().await;
    let catalog = MemoryCatalog::new();

    let report = run(&catalog, &settings(&server)).await.unwrap();

    assert!(report.categories.is_empty());
    assert_eq!(report.failed(), 0);
}
