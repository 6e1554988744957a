//! Tour model against a real database

use serde_json::json;
use tourbook::{
    config::DatabaseConfig,
    models::{TourInput, UpdateTour},
    query::{Accumulator, Filter, FindQuery, GroupKey, Pipeline},
    repository::Repository,
    services::{tours::ToursService, Services},
    AppError,
};
use uuid::Uuid;

async fn service() -> ToursService {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 2,
        min_connections: 1,
    };
    let repository = Repository::connect(&config).await.expect("Failed to connect");
    repository.migrate().await.expect("Failed to run migrations");
    Services::new(repository).tours
}

/// A name no other test run will use (10-40 characters)
fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

fn input(name: &str, secret: bool) -> TourInput {
    serde_json::from_value(json!({
        "name": name,
        "duration": 5,
        "maxGroupSize": 12,
        "difficulty": "easy",
        "price": 300,
        "summary": "  A walk among ancient trees ",
        "imageCover": "forest-cover.jpg",
        "startDates": ["2031-04-25T10:00:00Z", "2031-07-20T10:00:00Z"],
        "secretTour": secret
    }))
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_create_and_read_back() {
    let tours = service().await;
    let name = unique_name("Forest Walk");

    let created = tours.create(input(&name, false)).await.expect("create");
    assert_eq!(created.slug, tourbook::slug::slugify(&name));
    assert_eq!(created.summary, "A walk among ancient trees");
    assert_eq!(created.ratings_average, 4.0);

    let found = tours.find_by_slug(&created.slug).await.expect("find by slug");
    assert_eq!(found.id, created.id);
    assert_eq!(found.duration_weeks(), 5.0 / 7.0);

    tours.delete(created.id).await.expect("delete");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_name_is_a_conflict() {
    let tours = service().await;
    let name = unique_name("Sea Explorer");

    let created = tours.create(input(&name, false)).await.expect("create");
    let err = tours.create(input(&name, false)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);

    tours.delete(created.id).await.expect("delete");
}

#[tokio::test]
#[ignore]
async fn test_names_sharing_a_slug_are_a_conflict() {
    let tours = service().await;
    let name = unique_name("Forest Walk");

    let created = tours
        .create(input(&format!("{}!!", name), false))
        .await
        .expect("create");
    let err = tours
        .create(input(&format!("{}??", name), false))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);

    let found = tours.find_by_slug(&created.slug).await.expect("find by slug");
    assert_eq!(found.id, created.id);

    tours.delete(created.id).await.expect("delete");
}

#[tokio::test]
#[ignore]
async fn test_secret_tours_are_invisible() {
    let tours = service().await;
    let name = unique_name("Secret Valley");

    let secret = tours.create(input(&name, true)).await.expect("create");
    assert!(secret.secret_tour);

    let by_name = FindQuery::new().filter(Filter::new().and_eq("name", name.as_str()));
    assert!(tours.find(by_name).await.expect("find").is_empty());
    assert!(matches!(
        tours.find_by_id(secret.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        tours.update(secret.id, UpdateTour::default()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(tours.delete(secret.id).await, Err(AppError::NotFound(_))));

    let pipeline = Pipeline::new()
        .matching(Filter::new().and_eq("name", name.as_str()))
        .group(GroupKey::All, [("total", Accumulator::Count)]);
    let rows = tours.aggregate(pipeline).await.expect("aggregate");
    assert_eq!(rows[0]["total"], json!(0));

    let rows = tours
        .aggregate(Pipeline::new().matching(Filter::new().and_eq("secret_tour", true)))
        .await
        .expect("aggregate");
    assert!(rows.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_update_renames_and_revalidates() {
    let tours = service().await;
    let name = unique_name("Park Camper");
    let created = tours.create(input(&name, false)).await.expect("create");

    let err = tours
        .update(
            created.id,
            UpdateTour {
                price_discount: Some(Some(300.0)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let renamed = unique_name("Park Camper Plus");
    let updated = tours
        .update(
            created.id,
            UpdateTour {
                name: Some(renamed.clone()),
                price_discount: Some(Some(250.0)),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.slug, tourbook::slug::slugify(&renamed));
    assert_eq!(updated.price_discount, Some(250.0));
    assert_eq!(updated.created_at, created.created_at);

    tours.delete(created.id).await.expect("delete");
}

#[tokio::test]
#[ignore]
async fn test_monthly_plan_counts_visible_starts() {
    let tours = service().await;
    let visible = tours
        .create(input(&unique_name("Wine Taster"), false))
        .await
        .expect("create");
    let secret = tours
        .create(input(&unique_name("Hidden Wine"), true))
        .await
        .expect("create");

    let plan = tours.monthly_plan(2031).await.expect("monthly plan");
    let april = plan.iter().find(|m| m.month == 4).expect("april");
    assert!(april.tours.contains(&visible.name));
    assert!(!april.tours.contains(&secret.name));

    tours.delete(visible.id).await.expect("delete");
}
