use anyhow::Result;
use sqlx::{Sqlite, Transaction};

use super::schema::Database;
use super::types::Category;

struct CategoryDef {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    color: &'static str,
    icon: &'static str,
    provider_id: i64,
}

/// The one category registry. Order is display order.
///
/// `entretenimento` and `tv-celebridades` share provider id 4.
const REGISTRY: [CategoryDef; 8] = [
    CategoryDef {
        name: "Factuais",
        slug: "factuais",
        description: "Notícias e acontecimentos atuais",
        color: "bg-red-500",
        icon: "📰",
        provider_id: 0,
    },
    CategoryDef {
        name: "Esporte",
        slug: "esporte",
        description: "Esportes e competições",
        color: "bg-green-500",
        icon: "⚽",
        provider_id: 17,
    },
    CategoryDef {
        name: "Culinária",
        slug: "culinaria",
        description: "Gastronomia e receitas",
        color: "bg-orange-500",
        icon: "🍽️",
        provider_id: 5,
    },
    CategoryDef {
        name: "Entretenimento",
        slug: "entretenimento",
        description: "Shows, eventos e diversão",
        color: "bg-purple-500",
        icon: "🎭",
        provider_id: 4,
    },
    CategoryDef {
        name: "TV & Celebridades",
        slug: "tv-celebridades",
        description: "Televisão e famosos",
        color: "bg-pink-500",
        icon: "📺",
        provider_id: 4,
    },
    CategoryDef {
        name: "Política",
        slug: "politica",
        description: "Política e governo",
        color: "bg-blue-500",
        icon: "🏛️",
        provider_id: 14,
    },
    CategoryDef {
        name: "Tecnologia",
        slug: "tecnologia",
        description: "Inovação e tecnologia",
        color: "bg-indigo-500",
        icon: "💻",
        provider_id: 18,
    },
    CategoryDef {
        name: "Saúde e Bem-Estar",
        slug: "saude-bem-estar",
        description: "Saúde, medicina e qualidade de vida",
        color: "bg-teal-500",
        icon: "🏥",
        provider_id: 7,
    },
];

impl From<&CategoryDef> for Category {
    fn from(def: &CategoryDef) -> Self {
        Category {
            name: def.name.to_string(),
            slug: def.slug.to_string(),
            description: def.description.to_string(),
            color: def.color.to_string(),
            icon: def.icon.to_string(),
            provider_id: def.provider_id,
        }
    }
}

/// All categories in display order, without touching the database.
pub fn registry() -> Vec<Category> {
    REGISTRY.iter().map(Category::from).collect()
}

/// Look a category up by slug.
pub fn find_category(slug: &str) -> Option<Category> {
    REGISTRY
        .iter()
        .find(|def| def.slug == slug)
        .map(Category::from)
}

/// Replace the `categories` table contents with the registry.
pub(crate) async fn seed_categories(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM categories")
        .execute(&mut **tx)
        .await?;

    for (position, def) in REGISTRY.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO categories (position, name, slug, description, color, icon, provider_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(position as i64)
        .bind(def.name)
        .bind(def.slug)
        .bind(def.description)
        .bind(def.color)
        .bind(def.icon)
        .bind(def.provider_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

impl Database {
    // ========================================================================
    // Category Operations
    // ========================================================================

    /// List the categories stored by the last migration, in display order.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT name, slug, description, color, icon, provider_id
            FROM categories
            ORDER BY position
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_category(&self, slug: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT name, slug, description, color, icon, provider_id
            FROM categories
            WHERE slug = ?
        "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }
}
