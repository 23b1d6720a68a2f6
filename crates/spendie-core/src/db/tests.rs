//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::period::DateRange;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn jan() -> Period {
        Period::new(2024, 1).unwrap()
    }

    fn new_expense(amount: Decimal, category: &str, day: NaiveDate) -> NewExpense {
        NewExpense {
            amount,
            category: Some(category.to_string()),
            date: day,
            description: None,
            source: ExpenseSource::Manual,
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_expenses("u1").unwrap(), 0);
        assert!(db.list_categories("u1").unwrap().is_empty());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        db.run_migrations().unwrap();
        db.run_migrations().unwrap();
    }

    #[test]
    fn test_expense_crud() {
        let db = Database::in_memory().unwrap();

        let mut input = new_expense(dec!(12.50), "Food", date(2024, 1, 5));
        input.description = Some("lunch".into());
        let created = db.add_expense("u1", &input).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.amount, dec!(12.50));
        assert_eq!(created.category, "Food");
        assert_eq!(created.description.as_deref(), Some("lunch"));

        let fetched = db.get_expense("u1", created.id).unwrap();
        assert_eq!(fetched, created);

        let deleted = db.delete_expense("u1", created.id).unwrap();
        assert_eq!(deleted.id, created.id);
        let err = db.get_expense("u1", created.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_amounts_are_exact() {
        let db = Database::in_memory().unwrap();
        for _ in 0..10 {
            db.add_expense("u1", &new_expense(dec!(0.1), "Food", date(2024, 1, 2)))
                .unwrap();
        }
        assert_eq!(db.period_total("u1", "Food", jan()).unwrap(), dec!(1.0));
    }

    #[test]
    fn test_owners_are_isolated() {
        let db = Database::in_memory().unwrap();
        let theirs = db
            .add_expense("u1", &new_expense(dec!(40), "Food", date(2024, 1, 3)))
            .unwrap();

        let err = db.get_expense("u2", theirs.id).unwrap_err();
        assert_eq!(err.to_string(), format!("expense not found: {}", theirs.id));
        assert!(db.delete_expense("u2", theirs.id).is_err());
        assert_eq!(db.count_expenses("u1").unwrap(), 1);

        assert!(db.list_categories("u2").unwrap().is_empty());
        assert_eq!(db.period_total("u2", "Food", jan()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_categories_ignore_case() {
        let db = Database::in_memory().unwrap();
        db.add_expense("u1", &new_expense(dec!(10), "Food", date(2024, 1, 1)))
            .unwrap();
        let second = db
            .add_expense("u1", &new_expense(dec!(5), "FOOD", date(2024, 1, 2)))
            .unwrap();

        // First spelling wins
        assert_eq!(second.category, "Food");
        let categories = db.list_categories("u1").unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].expense_count, 2);
        assert_eq!(db.period_total("u1", "food", jan()).unwrap(), dec!(15));

        let err = db.create_category("u1", "food", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_categories_ignore_non_ascii_case() {
        let db = Database::in_memory().unwrap();
        db.set_budget("u1", "ÉPICERIE", jan(), dec!(100), false)
            .unwrap();
        let expense = db
            .add_expense("u1", &new_expense(dec!(90), "Travel", date(2024, 1, 3)))
            .unwrap();

        let changes = ExpenseChanges {
            category: Some("épicerie".into()),
            ..Default::default()
        };
        let (_, moved) = db.update_expense("u1", expense.id, &changes).unwrap();
        assert_eq!(moved.category, "ÉPICERIE");

        let names: Vec<String> = db
            .list_categories("u1")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"ÉPICERIE".to_string()));
        assert_eq!(
            db.period_total("u1", "épicerie", jan()).unwrap(),
            dec!(90)
        );
        assert!(db.get_budget("u1", "épicerie", jan()).unwrap().is_some());

        let err = db.create_category("u1", "Épicerie", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_create_category_with_parent() {
        let db = Database::in_memory().unwrap();
        let snacks = db.create_category("u1", "Snacks", Some("Food")).unwrap();
        assert_eq!(snacks.parent.as_deref(), Some("Food"));
        assert_eq!(db.list_categories("u1").unwrap().len(), 2);

        let err = db.create_category("u1", "Loop", Some("loop")).unwrap_err();
        assert!(err.to_string().starts_with("invalid parent"));
    }

    #[test]
    fn test_delete_category_with_expenses_is_rejected() {
        let db = Database::in_memory().unwrap();
        db.add_expense("u1", &new_expense(dec!(10), "Snacks", date(2024, 1, 1)))
            .unwrap();

        let err = db.delete_category("u1", "snacks", None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(err.to_string().contains("1 expense(s)"));
        assert_eq!(db.count_expenses("u1").unwrap(), 1);
        assert!(db.get_category("u1", "Snacks").is_ok());
    }

    #[test]
    fn test_delete_category_reassigns() {
        let db = Database::in_memory().unwrap();
        db.create_category("u1", "Chips", Some("Snacks")).unwrap();
        db.add_expense("u1", &new_expense(dec!(10), "Snacks", date(2024, 1, 1)))
            .unwrap();
        db.add_expense("u1", &new_expense(dec!(7), "Snacks", date(2024, 2, 1)))
            .unwrap();
        db.set_budget("u1", "Snacks", jan(), dec!(50), false).unwrap();

        let result = db.delete_category("u1", "Snacks", Some("Food")).unwrap();
        assert_eq!(result.category, "Snacks");
        assert_eq!(result.reassigned_to.as_deref(), Some("Food"));
        assert_eq!(result.expenses_moved, 2);
        assert_eq!(result.budgets_removed, 1);
        assert_eq!(result.children_reparented, 1);
        assert_eq!(
            result.periods,
            vec![jan(), Period::new(2024, 2).unwrap()]
        );

        assert_eq!(db.count_expenses("u1").unwrap(), 2);
        assert_eq!(db.period_total("u1", "Food", jan()).unwrap(), dec!(10));
        assert!(db.list_budgets("u1", None).unwrap().is_empty());
        assert_eq!(db.get_category("u1", "Chips").unwrap().parent, None);
        assert!(db.get_category("u1", "Snacks").is_err());
    }

    #[test]
    fn test_delete_category_into_itself() {
        let db = Database::in_memory().unwrap();
        db.create_category("u1", "Food", None).unwrap();
        let err = db.delete_category("u1", "Food", Some("FOOD")).unwrap_err();
        assert!(err.to_string().starts_with("invalid reassign_to"));
    }

    #[test]
    fn test_empty_category_deletes_without_target() {
        let db = Database::in_memory().unwrap();
        db.create_category("u1", "Unused", None).unwrap();
        let result = db.delete_category("u1", "unused", None).unwrap();
        assert_eq!(result.expenses_moved, 0);
        assert!(db.list_categories("u1").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_budget_conflicts() {
        let db = Database::in_memory().unwrap();
        db.set_budget("u1", "Food", jan(), dec!(100), false).unwrap();

        let err = db
            .set_budget("u1", "food", jan(), dec!(200), false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "a budget for Food in 2024-01 already exists; update it to change the limit"
        );
        let budget = db.get_budget("u1", "Food", jan()).unwrap().unwrap();
        assert_eq!(budget.limit, dec!(100));

        // Other months and owners are separate keys
        db.set_budget("u1", "Food", jan().next(), dec!(100), false)
            .unwrap();
        db.set_budget("u2", "Food", jan(), dec!(100), false).unwrap();
    }

    #[test]
    fn test_replace_budget() {
        let db = Database::in_memory().unwrap();
        db.set_budget("u1", "Food", jan(), dec!(100), false).unwrap();

        let same = db.set_budget("u1", "Food", jan(), dec!(100), true).unwrap();
        assert!(same.replaced);
        assert!(!same.reset);

        let changed = db.set_budget("u1", "Food", jan(), dec!(150), true).unwrap();
        assert!(changed.reset);
        assert_eq!(changed.budget.limit, dec!(150));
        assert_eq!(db.list_budgets("u1", Some(jan())).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_budget_clears_alert_state() {
        let db = Database::in_memory().unwrap();
        let written = db.set_budget("u1", "Food", jan(), dec!(100), false).unwrap();
        db.record_alert(&written.budget, dec!(0.8), dec!(85)).unwrap();
        assert_eq!(
            db.last_alerted_threshold("u1", "Food", jan()).unwrap(),
            Some(dec!(0.8))
        );

        db.delete_budget("u1", "food", jan()).unwrap();
        assert_eq!(db.last_alerted_threshold("u1", "Food", jan()).unwrap(), None);

        let err = db.delete_budget("u1", "Food", jan()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_record_alert_once() {
        let db = Database::in_memory().unwrap();
        let written = db.set_budget("u1", "Food", jan(), dec!(100), false).unwrap();
        assert!(db
            .record_alert(&written.budget, dec!(0.8), dec!(85))
            .unwrap()
            .is_some());
        assert!(db
            .record_alert(&written.budget, dec!(0.80), dec!(90))
            .unwrap()
            .is_none());
        assert_eq!(db.list_alerts("u1", None).unwrap().len(), 1);
    }

    #[test]
    fn test_update_expense_returns_before_and_after() {
        let db = Database::in_memory().unwrap();
        let created = db
            .add_expense("u1", &new_expense(dec!(30), "Food", date(2024, 1, 31)))
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(dec!(35)),
            category: Some("Travel".into()),
            date: Some(date(2024, 2, 1)),
            description: Some("taxi".into()),
        };
        let (before, after) = db.update_expense("u1", created.id, &changes).unwrap();
        assert_eq!(before, created);
        assert_eq!(after.amount, dec!(35));
        assert_eq!(after.category, "Travel");
        assert_eq!(after.period(), Period::new(2024, 2).unwrap());
        assert_eq!(after.description.as_deref(), Some("taxi"));

        let clear = ExpenseChanges {
            description: Some(String::new()),
            ..Default::default()
        };
        let (_, cleared) = db.update_expense("u1", created.id, &clear).unwrap();
        assert_eq!(cleared.description, None);
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let db = Database::in_memory().unwrap();
        let good = new_expense(dec!(10), "Food", date(2024, 1, 1));
        let mut bad = new_expense(dec!(5), "Food", date(2024, 1, 2));
        bad.category = None;

        assert!(db.import_expenses("u1", &[good.clone(), bad]).is_err());
        assert_eq!(db.count_expenses("u1").unwrap(), 0);

        let created = db.import_expenses("u1", &[good.clone(), good]).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(db.count_expenses("u1").unwrap(), 2);
    }

    #[test]
    fn test_list_expenses_filters() {
        let db = Database::in_memory().unwrap();
        let mut coffee = new_expense(dec!(4), "Food", date(2024, 1, 3));
        coffee.description = Some("Coffee 100%".into());
        db.add_expense("u1", &coffee).unwrap();
        db.add_expense("u1", &new_expense(dec!(60), "Food", date(2024, 1, 4)))
            .unwrap();
        db.add_expense("u1", &new_expense(dec!(300), "Rent", date(2024, 2, 1)))
            .unwrap();

        let all = db.list_expenses("u1", &ExpenseFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].category, "Rent");

        let food = ExpenseFilter {
            category: Some("food".into()),
            ..Default::default()
        };
        assert_eq!(db.list_expenses("u1", &food).unwrap().len(), 2);

        let keyword = ExpenseFilter {
            keyword: Some("100%".into()),
            ..Default::default()
        };
        let found = db.list_expenses("u1", &keyword).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, dec!(4));

        let amounts = ExpenseFilter {
            min_amount: Some(dec!(5)),
            max_amount: Some(dec!(100)),
            ..Default::default()
        };
        assert_eq!(db.list_expenses("u1", &amounts).unwrap()[0].amount, dec!(60));

        let january = ExpenseFilter {
            range: Some(jan().range()),
            limit: Some(1),
            ..Default::default()
        };
        let listed = db.list_expenses("u1", &january).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].date, date(2024, 1, 4));
    }

    #[test]
    fn test_reports() {
        let db = Database::in_memory().unwrap();
        db.create_category("u1", "Coffee", Some("Food")).unwrap();
        db.add_expense("u1", &new_expense(dec!(50), "Food", date(2024, 1, 5)))
            .unwrap();
        db.add_expense("u1", &new_expense(dec!(30), "Coffee", date(2024, 1, 10)))
            .unwrap();
        db.add_expense("u1", &new_expense(dec!(20), "Rent", date(2024, 2, 1)))
            .unwrap();

        let range = DateRange::new(date(2024, 1, 1), date(2024, 2, 29)).unwrap();
        let totals = db.aggregate_spending("u1", None, &range).unwrap();
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[0].period, jan());

        let summary = db.spending_summary("u1", &range, None, true).unwrap();
        assert_eq!(summary.total, dec!(100));
        assert_eq!(summary.categories[0].category, "Food");
        assert_eq!(summary.categories[0].amount, dec!(80));

        let err = db
            .daily_totals("u1", &DateRange::new(date(2023, 1, 1), date(2024, 12, 31)).unwrap(), None)
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid range"));

        db.set_budget("u1", "Food", jan(), dec!(100), false).unwrap();
        let statuses = db.budget_statuses("u1", Some(jan())).unwrap();
        assert_eq!(statuses[0].spent, dec!(50));
        assert_eq!(statuses[0].remaining, dec!(50));
    }
}
