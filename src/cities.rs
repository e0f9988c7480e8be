//! US city data served by the router's two tools
//!
//! `city_stats` holds population and state per city; the notes feed the
//! document search tool when no document directory is configured.

use crate::llm::LlmService;
use crate::tools::{Document, DocumentIndex, DocumentSearchTool, SqlDatabase, SqlQueryTool, Tool};
use rusqlite::{params, Connection};
use std::sync::Arc;

pub const CITY_TABLE: &str = "city_stats";

pub const SQL_TOOL_NAME: &str = "sql_tool";
pub const DOCUMENT_TOOL_NAME: &str = "document_search";

pub const SQL_TOOL_DESCRIPTION: &str = "Useful for translating a natural language query into a \
SQL query over a table containing: city_stats, containing the population/state of each city \
located in the USA.";

pub const DOCUMENT_TOOL_DESCRIPTION: &str =
    "Useful for answering semantic questions about certain cities in the US.";

/// `(city_name, population, state)`
pub const CITY_ROWS: &[(&str, i64, &str)] = &[
    ("New York City", 8_336_000, "New York"),
    ("Los Angeles", 3_822_000, "California"),
    ("Chicago", 2_665_000, "Illinois"),
    ("Houston", 2_303_000, "Texas"),
    ("Miami", 449_514, "Florida"),
    ("Seattle", 749_256, "Washington"),
];

pub const SAMPLE_QUERIES: &[&str] = &[
    "Which city has the highest population?",
    "List all places to visit in Miami.",
    "How do people in Chicago get around?",
    "What is the historical name of Los Angeles?",
];

const SCHEMA: &str = "CREATE TABLE city_stats (
    city_name TEXT PRIMARY KEY,
    population INTEGER,
    state TEXT NOT NULL
);";

pub fn city_names() -> Vec<&'static str> {
    CITY_ROWS.iter().map(|(name, _, _)| *name).collect()
}

/// Fresh in-memory `city_stats` database with the six seed rows
pub fn open_in_memory() -> rusqlite::Result<SqlDatabase> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    {
        let mut stmt = conn.prepare(
            "INSERT INTO city_stats (city_name, population, state) VALUES (?1, ?2, ?3)",
        )?;
        for (name, population, state) in CITY_ROWS {
            stmt.execute(params![name, population, state])?;
        }
    }
    Ok(SqlDatabase::new(conn, vec![CITY_TABLE.to_string()]))
}

/// Built-in city notes used when no document directory is configured
pub fn builtin_documents() -> Vec<Document> {
    vec![
        Document::new(
            "New York City",
            "New York City is made up of five boroughs: Manhattan, Brooklyn, Queens, the Bronx \
             and Staten Island.\n\n\
             Most New Yorkers get around by subway, which runs around the clock, along with \
             buses and ferries.",
        ),
        Document::new(
            "Los Angeles",
            "Los Angeles was founded in 1781 by Spanish settlers. Its historical name is \
             El Pueblo de Nuestra Senora la Reina de los Angeles.\n\n\
             Getting around Los Angeles usually means driving on its freeway network, although \
             the Metro rail and bus system keeps growing.",
        ),
        Document::new(
            "Chicago",
            "Chicago sits on the shore of Lake Michigan and is known for its architecture.\n\n\
             People in Chicago get around on the L, an elevated rapid transit train network, \
             plus CTA buses, Metra commuter rail and a large bike share program.",
        ),
        Document::new(
            "Houston",
            "Houston is home to NASA's Johnson Space Center and the Texas Medical Center.\n\n\
             Houston is a car-oriented city; METRO runs buses and a light rail line downtown.",
        ),
        Document::new(
            "Miami",
            "Places to visit in Miami include South Beach, the Art Deco Historic District, \
             Little Havana, Wynwood Walls, Vizcaya Museum and Gardens, and Everglades National \
             Park on the city's edge.\n\n\
             Miami was incorporated in 1896 and grew quickly after the Florida East Coast \
             Railway arrived.",
        ),
        Document::new(
            "Seattle",
            "Seattle landmarks include the Space Needle, Pike Place Market and the waterfront.\n\n\
             Seattle residents get around on Link light rail, King County Metro buses and \
             Washington State Ferries across Puget Sound.",
        ),
    ]
}

/// The router's standard tool list: SQL over `city_stats`, then document search
pub fn default_tools(
    db: SqlDatabase,
    sql_llm: Arc<dyn LlmService>,
    index: DocumentIndex,
) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SqlQueryTool::new(
            SQL_TOOL_NAME,
            SQL_TOOL_DESCRIPTION,
            db,
            sql_llm,
        )),
        Arc::new(DocumentSearchTool::new(
            DOCUMENT_TOOL_NAME,
            DOCUMENT_TOOL_DESCRIPTION,
            index,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_rows_loaded() {
        let db = open_in_memory().unwrap();
        let rows = db
            .query("SELECT city_name, population FROM city_stats ORDER BY population DESC")
            .unwrap()
            .rows;
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0][0].1, "New York City");
        assert_eq!(rows[0][1].1, "8336000");
        assert_eq!(rows[5][0].1, "Miami");
        assert_eq!(db.tables(), [CITY_TABLE.to_string()]);
    }

    #[test]
    fn test_builtin_notes_answer_sample_questions() {
        let index = DocumentIndex::from_documents(builtin_documents());
        assert_eq!(index.search(SAMPLE_QUERIES[1], 1)[0].title, "Miami");
        assert_eq!(index.search(SAMPLE_QUERIES[2], 1)[0].title, "Chicago");
        assert_eq!(index.search(SAMPLE_QUERIES[3], 1)[0].title, "Los Angeles");
    }

    #[test]
    fn test_city_names_in_fixture_order() {
        assert_eq!(city_names().first(), Some(&"New York City"));
        assert_eq!(city_names().len(), 6);
    }
}
