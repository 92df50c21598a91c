use crate::db::Database;
use crate::error::Result;
use crate::models::Record;

pub const EMPTY_NOTICE: &str = "No emails found in the database.";
const RULE_WIDTH: usize = 40;

pub struct Viewer<'a> {
    db: &'a Database,
}

impl<'a> Viewer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// One text block per stored record, oldest first.
    pub async fn render(&self) -> Result<Vec<String>> {
        let records = self.db.scan_all().await?;
        Ok(render_records(&records))
    }
}

/// Formats every record as a block, or a single notice when there are none.
pub fn render_records(records: &[Record]) -> Vec<String> {
    if records.is_empty() {
        return vec![EMPTY_NOTICE.to_string()];
    }
    records.iter().map(render_record).collect()
}

/// The body is printed exactly as stored; only the header lines are added.
fn render_record(record: &Record) -> String {
    format!(
        "{}\nFrom: {}\nSubject: {}\nDate: {}\n\n{}\n",
        "-".repeat(RULE_WIDTH),
        record.sender,
        record.subject,
        record.date,
        record.body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecord;

    fn record(id: i64, subject: &str, body: &str) -> Record {
        NewRecord {
            sender: "Alice <alice@example.com>".to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            date: "Mon, 2 Jan 2023 10:00:00 +0000".to_string(),
        }
        .with_id(id)
    }

    #[test]
    fn test_empty_store_renders_notice() {
        assert_eq!(render_records(&[]), vec![EMPTY_NOTICE.to_string()]);
    }

    #[test]
    fn test_block_contains_every_field() {
        let blocks = render_records(&[record(1, "Lunch", "See you at noon.")]);

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0],
            format!(
                "{}\nFrom: Alice <alice@example.com>\nSubject: Lunch\nDate: Mon, 2 Jan 2023 10:00:00 +0000\n\nSee you at noon.\n",
                "-".repeat(40)
            )
        );
    }

    #[test]
    fn test_body_is_printed_as_stored() {
        let body = "Hi,\r\n\r\n\r\n  indented line   \r\n\tsigned\r\n";

        let blocks = render_records(&[record(7, "Spacing", body)]);

        assert!(blocks[0].ends_with(&format!("\n\n{}\n", body)));
    }

    #[test]
    fn test_empty_fields_still_render_labels() {
        let blocks = render_records(&[record(2, "", "")]);

        assert!(blocks[0].contains("\nSubject: \n"));
        assert!(blocks[0].ends_with("Date: Mon, 2 Jan 2023 10:00:00 +0000\n\n\n"));
    }

    #[tokio::test]
    async fn test_render_follows_insertion_order() {
        let db = Database::open_in_memory().await.unwrap();
        db.ensure_schema().await.unwrap();
        for subject in ["first", "second", "third"] {
            db.insert(&NewRecord {
                subject: subject.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }

        let blocks = Viewer::new(&db).render().await.unwrap();

        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("Subject: first"));
        assert!(blocks[1].contains("Subject: second"));
        assert!(blocks[2].contains("Subject: third"));
        assert_eq!(db.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_render_empty_database() {
        let db = Database::open_in_memory().await.unwrap();
        db.ensure_schema().await.unwrap();

        let blocks = Viewer::new(&db).render().await.unwrap();

        assert_eq!(blocks, vec![EMPTY_NOTICE.to_string()]);
    }
}
