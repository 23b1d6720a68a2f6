//! Category operations

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{category_key, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, DeleteCategoryResult};
use crate::period::Period;

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.owner, c.name, p.name,
           (SELECT COUNT(*) FROM expenses e WHERE e.category_id = c.id),
           c.created_at
    FROM categories c
    LEFT JOIN categories p ON p.id = c.parent_id
"#;

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    let created_at: String = row.get(5)?;
    Ok(Category {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        parent: row.get(3)?,
        expense_count: row.get(4)?,
        created_at: parse_datetime(&created_at),
    })
}

/// Look up a category id and its stored spelling (case-insensitive)
pub(crate) fn find_category(
    conn: &Connection,
    owner: &str,
    name: &str,
) -> Result<Option<(i64, String)>> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM categories WHERE owner = ? AND name_key = ?",
            params![owner, category_key(name)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

/// Return the category's id, creating it on first use
pub(crate) fn ensure_category(conn: &Connection, owner: &str, name: &str) -> Result<i64> {
    if let Some((id, _)) = find_category(conn, owner, name)? {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO categories (owner, name, name_key) VALUES (?, ?, ?)",
        params![owner, name, category_key(name)],
    )?;
    info!(owner, category = name, "Category created");
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Create a category explicitly, optionally under a parent.
    ///
    /// The parent is created implicitly if it does not exist yet.
    pub fn create_category(&self, owner: &str, name: &str, parent: Option<&str>) -> Result<Category> {
        if let Some(parent) = parent {
            if category_key(parent) == category_key(name) {
                return Err(Error::validation(
                    "parent",
                    "a category cannot be its own parent",
                ));
            }
        }

        let id = self.write(owner, |conn| {
            if let Some((_, existing)) = find_category(conn, owner, name)? {
                return Err(Error::Conflict(format!(
                    "category already exists: {}",
                    existing
                )));
            }
            let parent_id = parent
                .map(|p| ensure_category(conn, owner, p))
                .transpose()?;
            conn.execute(
                "INSERT INTO categories (owner, name, name_key, parent_id) VALUES (?, ?, ?, ?)",
                params![owner, name, category_key(name), parent_id],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        info!(owner, category = name, "Category created");
        self.get_category_by_id(owner, id)
    }

    fn get_category_by_id(&self, owner: &str, id: i64) -> Result<Category> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE c.owner = ? AND c.id = ?", CATEGORY_SELECT),
            params![owner, id],
            row_to_category,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("category", id))
    }

    /// Get a category by name (case-insensitive)
    pub fn get_category(&self, owner: &str, name: &str) -> Result<Category> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE c.owner = ? AND c.name_key = ?", CATEGORY_SELECT),
            params![owner, category_key(name)],
            row_to_category,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("category", name))
    }

    /// List all categories for an owner, by name
    pub fn list_categories(&self, owner: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.owner = ? ORDER BY c.name",
            CATEGORY_SELECT
        ))?;
        let categories = stmt
            .query_map(params![owner], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Delete a category without orphaning expenses.
    ///
    /// With expenses and no `reassign_to`, the delete is rejected with a
    /// conflict. With `reassign_to`, expenses move to that category (created
    /// if needed). Child categories move up to the deleted category's parent.
    /// Budgets and alert state for the deleted category are removed.
    pub fn delete_category(
        &self,
        owner: &str,
        name: &str,
        reassign_to: Option<&str>,
    ) -> Result<DeleteCategoryResult> {
        let result = self.write(owner, |conn| {
            let (id, stored_name) = find_category(conn, owner, name)?
                .ok_or_else(|| Error::not_found("category", name))?;

            let parent_id: Option<i64> = conn.query_row(
                "SELECT parent_id FROM categories WHERE id = ?",
                params![id],
                |row| row.get(0),
            )?;

            let expense_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM expenses WHERE category_id = ?",
                params![id],
                |row| row.get(0),
            )?;

            let target = match reassign_to {
                Some(target) if category_key(target) == category_key(&stored_name) => {
                    return Err(Error::validation(
                        "reassign_to",
                        "cannot reassign expenses to the category being deleted",
                    ));
                }
                Some(target) => {
                    let target_id = ensure_category(conn, owner, target)?;
                    let target_name: String = conn.query_row(
                        "SELECT name FROM categories WHERE id = ?",
                        params![target_id],
                        |row| row.get(0),
                    )?;
                    Some((target_id, target_name))
                }
                None => None,
            };

            if expense_count > 0 && target.is_none() {
                return Err(Error::Conflict(format!(
                    "category '{}' still has {} expense(s); reassign them to another category to delete it",
                    stored_name, expense_count
                )));
            }

            let mut periods: Vec<Period> = {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT substr(date, 1, 7) FROM expenses WHERE category_id = ?",
                )?;
                let rows = stmt
                    .query_map(params![id], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.iter().filter_map(|p| p.parse().ok()).collect()
            };
            periods.sort();

            let mut expenses_moved = 0;
            if let Some((target_id, _)) = &target {
                expenses_moved = conn.execute(
                    "UPDATE expenses SET category_id = ?, updated_at = CURRENT_TIMESTAMP WHERE category_id = ?",
                    params![target_id, id],
                )? as i64;
            }

            // Reparent children to grandparent
            let children_reparented = conn.execute(
                "UPDATE categories SET parent_id = ? WHERE parent_id = ?",
                params![parent_id, id],
            )? as i64;

            conn.execute(
                "DELETE FROM budget_alerts WHERE category_id = ?",
                params![id],
            )?;
            let budgets_removed =
                conn.execute("DELETE FROM budgets WHERE category_id = ?", params![id])? as i64;

            conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;

            Ok(DeleteCategoryResult {
                category: stored_name,
                reassigned_to: target.map(|(_, name)| name),
                expenses_moved,
                budgets_removed,
                children_reparented,
                periods,
            })
        })?;

        info!(
            owner,
            category = %result.category,
            moved = result.expenses_moved,
            "Category deleted"
        );
        Ok(result)
    }

    /// (name, parent) pairs for building category rollups
    pub fn category_hierarchy(&self, owner: &str) -> Result<Vec<(String, Option<String>)>> {
        Ok(self
            .list_categories(owner)?
            .into_iter()
            .map(|c| (c.name, c.parent))
            .collect())
    }
}
