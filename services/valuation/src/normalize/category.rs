use crate::component::Category;

use super::tokens::KeyTokens;

const GPU_TOKENS: &[&str] = &["gpu", "graphics", "rtx", "gtx", "radeon", "geforce", "rx", "arc"];
const CPU_TOKENS: &[&str] = &[
    "cpu", "processor", "processeur", "ryzen", "core", "i3", "i5", "i7", "i9", "xeon", "athlon",
    "pentium",
];
const RAM_TOKENS: &[&str] = &["ram", "memory", "memoire", "ddr", "ddr3", "ddr4", "ddr5"];
const STORAGE_TOKENS: &[&str] = &["ssd", "nvme", "hdd", "storage", "m2", "disque", "sata"];
const PSU_TOKENS: &[&str] = &["psu", "alimentation", "alim"];

/// Tag a normalized key with its component category.
///
/// GPU is tested first so `rtx 3060 12gb` is not mistaken for RAM.
/// Motherboards, cases and coolers fall through to `Other`.
pub fn categorize(key: &str) -> Category {
    let tokens = KeyTokens::new(key);

    if tokens.has_any(GPU_TOKENS) || tokens.has_prefix("rtx") || tokens.has_prefix("gtx") {
        Category::Gpu
    } else if tokens.has_any(CPU_TOKENS) {
        Category::Cpu
    } else if tokens.has_any(RAM_TOKENS) {
        Category::Ram
    } else if tokens.has_any(STORAGE_TOKENS) {
        Category::Storage
    } else if tokens.has_any(PSU_TOKENS)
        || tokens.has_all(&["power", "supply"])
        || tokens.has_quantity("w")
    {
        Category::Psu
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn category_of(raw: &str) -> Category {
        categorize(&normalize(raw))
    }

    #[test]
    fn test_categorize_component() {
        assert_eq!(category_of("RTX 4090"), Category::Gpu);
        assert_eq!(category_of("nvidia rtx 3060"), Category::Gpu);
        assert_eq!(category_of("AMD RX 6800XT"), Category::Gpu);
        assert_eq!(category_of("GTX 1060 6GB"), Category::Gpu);
        assert_eq!(category_of("Ryzen 9 7950x"), Category::Cpu);
        assert_eq!(category_of("Intel i7-13700k"), Category::Cpu);
        assert_eq!(category_of("16GB DDR5 RAM"), Category::Ram);
        assert_eq!(category_of("Kingston Fury Beast 2x16GB DDR5"), Category::Ram);
        assert_eq!(category_of("2TB SSD NVMe"), Category::Storage);
        assert_eq!(category_of("1TB HDD"), Category::Storage);
        assert_eq!(category_of("Corsair 850W PSU"), Category::Psu);
        assert_eq!(category_of("Seasonic 850W 80plus Bronze"), Category::Psu);
        assert_eq!(category_of("850W Power Supply"), Category::Psu);
    }

    #[test]
    fn test_other_components() {
        assert_eq!(category_of("Z790 Motherboard"), Category::Other);
        assert_eq!(category_of("Lian Li Case"), Category::Other);
        assert_eq!(category_of("Noctua Cooler"), Category::Other);
        assert_eq!(category_of(""), Category::Other);
    }
}
