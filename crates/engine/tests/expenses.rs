use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use engine::{
    AccessPolicy, CreateExpenseCmd, Engine, EngineError, Expense, ExpenseListFilter, ExpenseSort,
    ExpenseWithOwner, NewUser, Principal, Role, StatsRange, UpdateExpenseCmd, parse_day,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn migrated_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_policy(policy: AccessPolicy) -> Engine {
    Engine::builder()
        .database(migrated_db().await)
        .access_policy(policy)
        .build()
        .await
        .unwrap()
}

async fn new_engine() -> Engine {
    engine_with_policy(AccessPolicy::default()).await
}

async fn signup(engine: &Engine, email: &str, budget: i64, role: Role) -> Principal {
    let user = engine
        .create_user(NewUser {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: email.split('@').next().unwrap().to_string(),
            password: "secret".to_string(),
            budget_limit_minor: budget,
            role,
        })
        .await
        .unwrap();
    Principal::new(user.id, user.role)
}

async fn add(engine: &Engine, who: &Principal, title: &str, price: i64, date: &str) -> Expense {
    engine
        .create_expense(
            who,
            CreateExpenseCmd {
                title: Some(title.to_string()),
                price_minor: Some(price),
                date: Some(date.to_string()),
            },
        )
        .await
        .unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

async fn sorted_titles(engine: &Engine, who: &Principal, sort: ExpenseSort) -> Vec<String> {
    let filter = ExpenseListFilter {
        sort,
        ..Default::default()
    };
    let rows = engine.list_expenses(who, &filter).await.unwrap();
    rows.into_iter().map(|r| r.expense.title).collect()
}

fn titles(rows: &[ExpenseWithOwner]) -> Vec<&str> {
    rows.iter().map(|r| r.expense.title.as_str()).collect()
}

#[tokio::test]
async fn create_stores_expenditure_against_current_budget() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;

    let expense = add(&engine, &alice, "Groceries", 25_000, "2024-03-01").await;
    assert_eq!(expense.expenditure, 50);
    assert_eq!(expense.owner_id, alice.user_id);
    assert_eq!(expense.date, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

    let over = add(&engine, &alice, "Laptop", 75_000, "2024-03-02T10:00:00Z").await;
    assert_eq!(over.expenditure, 150);

    let fetched = engine.expense(&alice, expense.id).await.unwrap();
    assert_eq!(fetched, expense);
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let missing = Err(EngineError::Validation(
        "please provide title, price, and date".to_string(),
    ));

    let no_title = CreateExpenseCmd {
        title: Some("   ".to_string()),
        price_minor: Some(100),
        date: Some("2024-03-01".to_string()),
    };
    assert_eq!(engine.create_expense(&alice, no_title).await, missing);

    let zero_price = CreateExpenseCmd {
        title: Some("Coffee".to_string()),
        price_minor: Some(0),
        date: Some("2024-03-01".to_string()),
    };
    assert_eq!(engine.create_expense(&alice, zero_price).await, missing);

    let no_date = CreateExpenseCmd {
        title: Some("Coffee".to_string()),
        price_minor: Some(100),
        date: None,
    };
    assert_eq!(engine.create_expense(&alice, no_date).await, missing);

    let bad_date = CreateExpenseCmd {
        title: Some("Coffee".to_string()),
        price_minor: Some(100),
        date: Some("yesterday".to_string()),
    };
    assert!(matches!(
        engine.create_expense(&alice, bad_date).await,
        Err(EngineError::Validation(_))
    ));

    let listed = engine
        .list_expenses(&alice, &ExpenseListFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn create_for_unknown_owner_is_not_found() {
    let engine = new_engine().await;
    let ghost = Principal::new(Uuid::new_v4(), Role::User);

    let res = engine
        .create_expense(
            &ghost,
            CreateExpenseCmd {
                title: Some("Coffee".to_string()),
                price_minor: Some(300),
                date: Some("2024-03-01".to_string()),
            },
        )
        .await;
    assert_eq!(res, Err(EngineError::KeyNotFound("user not exists".to_string())));
}

#[tokio::test]
async fn users_only_see_their_own_expenses_and_admins_see_all() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let bob = signup(&engine, "bob@example.com", 10_000, Role::User).await;
    let admin = signup(&engine, "root@example.com", 10_000, Role::Admin).await;

    let alices = add(&engine, &alice, "Rent", 40_000, "2024-03-01").await;
    let bobs = add(&engine, &bob, "Bike", 5_000, "2024-03-02").await;

    let filter = ExpenseListFilter::default();
    let seen_by_alice = engine.list_expenses(&alice, &filter).await.unwrap();
    assert_eq!(titles(&seen_by_alice), vec!["Rent"]);
    let owner = seen_by_alice[0].owner.as_ref().unwrap();
    assert_eq!(owner.id, alice.user_id);
    assert_eq!(owner.last_name, "alice");

    let seen_by_admin = engine.list_expenses(&admin, &filter).await.unwrap();
    assert_eq!(titles(&seen_by_admin), vec!["Bike", "Rent"]);

    assert_eq!(
        engine.expense(&alice, bobs.id).await,
        Err(EngineError::KeyNotFound("expense not exists".to_string()))
    );
    assert_eq!(engine.expense(&admin, alices.id).await.unwrap().id, alices.id);
}

#[tokio::test]
async fn day_filter_is_half_open() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;

    add(&engine, &alice, "Late dinner", 1_000, "2024-03-14T23:59:59Z").await;
    add(&engine, &alice, "Breakfast", 1_000, "2024-03-15T00:00:00Z").await;
    add(&engine, &alice, "Lunch", 1_000, "2024-03-15T12:30:00Z").await;
    add(&engine, &alice, "Midnight snack", 1_000, "2024-03-16T00:00:00Z").await;

    let filter = ExpenseListFilter {
        day: NaiveDate::from_ymd_opt(2024, 3, 15),
        sort: ExpenseSort::OldDate,
        ..Default::default()
    };
    let rows = engine.list_expenses(&alice, &filter).await.unwrap();
    assert_eq!(titles(&rows), vec!["Breakfast", "Lunch"]);

    let ignored = ExpenseListFilter {
        day: parse_day("null"),
        ..Default::default()
    };
    assert_eq!(engine.list_expenses(&alice, &ignored).await.unwrap().len(), 4);
}

#[tokio::test]
async fn listing_sorts_by_requested_key() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;

    add(&engine, &alice, "B", 2_000, "2024-01-02").await;
    add(&engine, &alice, "A", 3_000, "2024-01-01").await;
    add(&engine, &alice, "C", 1_000, "2024-01-03").await;

    assert_eq!(sorted_titles(&engine, &alice, ExpenseSort::HighPrice).await, vec!["A", "B", "C"]);
    assert_eq!(sorted_titles(&engine, &alice, ExpenseSort::LowPrice).await, vec!["C", "B", "A"]);
    assert_eq!(sorted_titles(&engine, &alice, ExpenseSort::OldDate).await, vec!["A", "B", "C"]);
    assert_eq!(sorted_titles(&engine, &alice, ExpenseSort::NewDate).await, vec!["C", "B", "A"]);
}

#[tokio::test]
async fn keyword_matches_case_insensitive_literal_substring() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;

    add(&engine, &alice, "Coffee beans", 1_500, "2024-03-01").await;
    add(&engine, &alice, "COFFEE machine", 20_000, "2024-03-02").await;
    add(&engine, &alice, "Tea", 500, "2024-03-03").await;
    add(&engine, &alice, "100% juice", 300, "2024-03-04").await;

    let search = |keyword: &str| ExpenseListFilter {
        keyword: Some(keyword.to_string()),
        sort: ExpenseSort::OldDate,
        ..Default::default()
    };

    let rows = engine.list_expenses(&alice, &search("coffee")).await.unwrap();
    assert_eq!(titles(&rows), vec!["Coffee beans", "COFFEE machine"]);

    let rows = engine.list_expenses(&alice, &search("%")).await.unwrap();
    assert_eq!(titles(&rows), vec!["100% juice"]);

    let rows = engine.list_expenses(&alice, &search("   ")).await.unwrap();
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn only_owners_modify_by_default() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let bob = signup(&engine, "bob@example.com", 50_000, Role::User).await;
    let admin = signup(&engine, "root@example.com", 50_000, Role::Admin).await;

    let expense = add(&engine, &alice, "Rent", 40_000, "2024-03-01").await;
    let forbidden = Err(EngineError::Forbidden("user not authorized".to_string()));

    let rename = |expense_id: Uuid| UpdateExpenseCmd {
        expense_id,
        title: Some("Mine now".to_string()),
        price_minor: None,
        date: None,
    };

    assert_eq!(engine.update_expense(&bob, rename(expense.id)).await, forbidden);
    assert_eq!(engine.update_expense(&admin, rename(expense.id)).await, forbidden);
    assert_eq!(
        engine.delete_expense(&bob, expense.id).await,
        Err(EngineError::Forbidden("user not authorized".to_string()))
    );
    assert_eq!(
        engine.delete_expense(&admin, expense.id).await,
        Err(EngineError::Forbidden("user not authorized".to_string()))
    );
    assert_eq!(
        engine.delete_expense(&alice, Uuid::new_v4()).await,
        Err(EngineError::KeyNotFound("expense not exists".to_string()))
    );

    let unchanged = engine.expense(&alice, expense.id).await.unwrap();
    assert_eq!(unchanged.title, "Rent");

    engine.delete_expense(&alice, expense.id).await.unwrap();
    assert!(
        engine
            .list_expenses(&alice, &ExpenseListFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn admin_policy_allows_admins_to_modify_any_expense() {
    let engine = engine_with_policy(AccessPolicy {
        admin_can_modify_any: true,
    })
    .await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let bob = signup(&engine, "bob@example.com", 50_000, Role::User).await;
    let admin = signup(&engine, "root@example.com", 10_000, Role::Admin).await;

    let expense = add(&engine, &alice, "Rent", 40_000, "2024-03-01").await;

    let updated = engine
        .update_expense(
            &admin,
            UpdateExpenseCmd {
                expense_id: expense.id,
                title: None,
                price_minor: Some(10_000),
                date: None,
            },
        )
        .await
        .unwrap();
    // Utilization follows the owner's budget, not the admin's.
    assert_eq!(updated.expenditure, 20);
    assert_eq!(updated.owner_id, alice.user_id);

    assert!(matches!(
        engine.delete_expense(&bob, expense.id).await,
        Err(EngineError::Forbidden(_))
    ));
    engine.delete_expense(&admin, expense.id).await.unwrap();
}

#[tokio::test]
async fn update_keeps_absent_fields_and_recomputes_expenditure() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let expense = add(&engine, &alice, "Groceries", 25_000, "2024-03-01").await;

    let updated = engine
        .update_expense(
            &alice,
            UpdateExpenseCmd {
                expense_id: expense.id,
                title: Some("Weekly groceries".to_string()),
                price_minor: None,
                date: Some("".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Weekly groceries");
    assert_eq!(updated.price_minor, 25_000);
    assert_eq!(updated.date, expense.date);
    assert_eq!(updated.expenditure, 50);
    assert_eq!(updated.created_at, expense.created_at);

    let found = engine
        .list_expenses(
            &alice,
            &ExpenseListFilter {
                keyword: Some("weekly".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn budget_change_leaves_stored_expenditure_stale() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let expense = add(&engine, &alice, "Groceries", 25_000, "2024-03-01").await;

    let user = engine
        .update_budget_limit(&alice, alice.user_id, 100_000)
        .await
        .unwrap();
    assert_eq!(user.budget_limit_minor, 100_000);

    let stored = engine.expense(&alice, expense.id).await.unwrap();
    assert_eq!(stored.expenditure, 50);

    let touched = engine
        .update_expense(
            &alice,
            UpdateExpenseCmd {
                expense_id: expense.id,
                title: None,
                price_minor: None,
                date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(touched.expenditure, 25);

    let fresh = add(&engine, &alice, "Dinner", 25_000, "2024-03-02").await;
    assert_eq!(fresh.expenditure, 25);
}

#[tokio::test]
async fn budget_limit_must_be_positive_and_is_self_or_admin() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let bob = signup(&engine, "bob@example.com", 50_000, Role::User).await;
    let admin = signup(&engine, "root@example.com", 50_000, Role::Admin).await;

    assert!(matches!(
        engine.update_budget_limit(&alice, alice.user_id, 0).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.update_budget_limit(&bob, alice.user_id, 1_000).await,
        Err(EngineError::Forbidden(_))
    ));
    let user = engine
        .update_budget_limit(&admin, alice.user_id, 1_000)
        .await
        .unwrap();
    assert_eq!(user.budget_limit_minor, 1_000);
}

#[tokio::test]
async fn stats_cover_trailing_months_from_first_of_month() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let bob = signup(&engine, "bob@example.com", 50_000, Role::User).await;

    add(&engine, &alice, "Too old", 9_000, "2023-12-31T23:59:59Z").await;
    add(&engine, &alice, "January", 1_000, "2024-01-01T00:00:00Z").await;
    add(&engine, &alice, "February a", 2_000, "2024-02-10").await;
    add(&engine, &alice, "February b", 500, "2024-02-20").await;
    add(&engine, &alice, "Later this month", 700, "2024-03-28").await;
    add(&engine, &bob, "Not alice's", 100_000, "2024-03-01").await;

    let stats = engine
        .expense_stats(&alice, StatsRange::ThreeMonths, at(2024, 3, 15))
        .await
        .unwrap();

    assert_eq!(stats.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(stats.total_spent_minor, 4_200);
    assert_eq!(stats.expense_count, 4);
    let monthly: Vec<_> = stats
        .monthly_spending
        .iter()
        .map(|m| (m.year, m.month, m.total_minor))
        .collect();
    assert_eq!(monthly, vec![(2024, 1, 1_000), (2024, 2, 2_500), (2024, 3, 700)]);
    assert_eq!(
        stats.monthly_spending.iter().map(|m| m.total_minor).sum::<i64>(),
        stats.total_spent_minor
    );
}

#[tokio::test]
async fn stats_for_empty_window_are_zero() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    add(&engine, &alice, "Long ago", 1_000, "2020-05-05").await;

    let stats = engine
        .expense_stats(&alice, StatsRange::SixMonths, at(2024, 3, 15))
        .await
        .unwrap();
    assert_eq!(stats.total_spent_minor, 0);
    assert_eq!(stats.expense_count, 0);
    assert!(stats.monthly_spending.is_empty());
    assert!(stats.top_expenses.is_empty());

    let dense = stats.densified(at(2024, 3, 15));
    assert_eq!(dense.monthly_spending.len(), 6);
    assert!(dense.monthly_spending.iter().all(|m| m.total_minor == 0));
    assert_eq!(
        (dense.monthly_spending[0].year, dense.monthly_spending[0].month),
        (2023, 10)
    );
}

#[tokio::test]
async fn stats_top_expenses_are_five_highest_prices() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let admin = signup(&engine, "root@example.com", 50_000, Role::Admin).await;

    for (title, price, date) in [
        ("p100", 100, "2024-03-01"),
        ("p700", 700, "2024-03-02"),
        ("p300", 300, "2024-03-03"),
        ("p500 old", 500, "2024-02-01"),
        ("p500 new", 500, "2024-03-04"),
        ("p200", 200, "2024-03-05"),
        ("p900", 900, "2024-03-06"),
    ] {
        add(&engine, &alice, title, price, date).await;
    }
    add(&engine, &admin, "admin p800", 800, "2024-03-07").await;

    let stats = engine
        .expense_stats(&alice, StatsRange::TwelveMonths, at(2024, 3, 15))
        .await
        .unwrap();
    let top: Vec<_> = stats.top_expenses.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(top, vec!["p900", "p700", "p500 new", "p500 old", "p300"]);

    let all = engine
        .expense_stats(&admin, StatsRange::TwelveMonths, at(2024, 3, 15))
        .await
        .unwrap();
    assert_eq!(all.expense_count, 8);
    assert_eq!(all.top_expenses[1].title, "admin p800");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let engine = new_engine().await;
    signup(&engine, "alice@example.com", 50_000, Role::User).await;

    let res = engine
        .create_user(NewUser {
            email: "  ALICE@example.com".to_string(),
            first_name: "Other".to_string(),
            last_name: "Alice".to_string(),
            password: "pw".to_string(),
            budget_limit_minor: 1_000,
            role: Role::User,
        })
        .await;
    assert_eq!(res, Err(EngineError::ExistingKey("alice@example.com".to_string())));
}

#[tokio::test]
async fn authenticate_checks_password() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;

    let principal = engine
        .authenticate("Alice@Example.com", "secret")
        .await
        .unwrap();
    assert_eq!(principal, alice);

    let invalid = Err(EngineError::Unauthenticated("invalid email or password".to_string()));
    assert_eq!(engine.authenticate("alice@example.com", "wrong").await, invalid);
    assert_eq!(
        engine.authenticate("nobody@example.com", "secret").await,
        Err(EngineError::Unauthenticated("invalid email or password".to_string()))
    );
}

#[tokio::test]
async fn scoping_holds_under_every_filter() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let bob = signup(&engine, "bob@example.com", 50_000, Role::User).await;

    add(&engine, &alice, "Coffee", 300, "2024-03-15T08:00:00Z").await;
    add(&engine, &bob, "Coffee", 900, "2024-03-15T09:00:00Z").await;

    let filter = ExpenseListFilter {
        day: NaiveDate::from_ymd_opt(2024, 3, 15),
        keyword: Some("COF".to_string()),
        sort: ExpenseSort::HighPrice,
    };
    let rows = engine.list_expenses(&alice, &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows.iter().all(|r| r.expense.owner_id == alice.user_id));
    assert_eq!(rows[0].expense.price_minor, 300);
}

#[tokio::test]
async fn failing_stats_query_reports_aggregation_failure() {
    let db = migrated_db().await;
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    add(&engine, &alice, "Coffee", 300, "2024-03-15").await;

    db.execute_unprepared("DROP TABLE expenses").await.unwrap();

    let res = engine
        .expense_stats(&alice, StatsRange::ThreeMonths, at(2024, 3, 20))
        .await;
    match res {
        Err(EngineError::AggregationFailed(msg)) => assert!(msg.contains("no such table")),
        other => panic!("expected aggregation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn only_admins_list_users() {
    let engine = new_engine().await;
    let alice = signup(&engine, "alice@example.com", 50_000, Role::User).await;
    let admin = signup(&engine, "root@example.com", 50_000, Role::Admin).await;

    assert_eq!(
        engine.list_users(&alice).await,
        Err(EngineError::Forbidden("user not authorized".to_string()))
    );

    let users = engine.list_users(&admin).await.unwrap();
    let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["alice@example.com", "root@example.com"]);

    let read = engine.user(&admin, alice.user_id).await.unwrap();
    assert_eq!(read.id, alice.user_id);
}
