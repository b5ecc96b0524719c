//! Static seed dataset.
//!
//! Last link of the search fallback chain: used when neither the index
//! nor a catalog snapshot is reachable. The guarantee is existence of a
//! response, not completeness.

use once_cell::sync::Lazy;

use crate::domain::product::{ProductRecord, VolatilityFlags};

static SEED_PRODUCTS: Lazy<Vec<ProductRecord>> = Lazy::new(|| {
    vec![
        seed(
            "seed-1",
            "kit-enxoval-completo",
            "Kit Enxoval Completo",
            "Enxoval completo para o quarto do bebê com lençóis e mantas",
            "Enxoval",
            "Ateliê Estrela",
            249.9,
        ),
        seed(
            "seed-2",
            "berco-montessoriano",
            "Berço Montessoriano",
            "Berço baixo em madeira natural no estilo montessoriano",
            "Berços",
            "Móveis Aurora",
            899.0,
        ),
        seed(
            "seed-3",
            "mobile-musical-estrelas",
            "Mobile Musical Estrelas",
            "Mobile musical com estrelas em feltro para berço",
            "Decoração",
            "Ateliê Estrela",
            119.5,
        ),
        seed(
            "seed-4",
            "kit-higiene-bambu",
            "Kit Higiene Bambu",
            "Kit de higiene com potes de bambu e bandeja",
            "Higiene",
            "Casa Verde",
            179.0,
        ),
        seed(
            "seed-5",
            "manta-tricot-nuvem",
            "Manta Tricot Nuvem",
            "Manta de tricot macia com estampa de nuvens",
            "Enxoval",
            "Móveis Aurora",
            89.9,
        ),
    ]
});

fn seed(
    id: &str,
    slug: &str,
    name: &str,
    description: &str,
    category: &str,
    vendor: &str,
    price: f64,
) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        slug: slug.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        vendor: vendor.to_string(),
        price,
        flags: VolatilityFlags::default(),
    }
}

pub fn seed_products() -> &'static [ProductRecord] {
    &SEED_PRODUCTS
}
