use core::fmt;
use core::ops::{Index, IndexMut};
use std::array;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Category {
    Math = 0,
    Biology = 1,
    Chemistry = 2,
    Physics = 3,
    EarthSpace = 4,
    Energy = 5,
}

impl Category {
    pub const COUNT: usize = 6;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Math,
        Category::Biology,
        Category::Chemistry,
        Category::Physics,
        Category::EarthSpace,
        Category::Energy,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Category::Math),
            1 => Some(Category::Biology),
            2 => Some(Category::Chemistry),
            3 => Some(Category::Physics),
            4 => Some(Category::EarthSpace),
            5 => Some(Category::Energy),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Energy questions are paired within their sub-category.
    pub const fn requires_subcategory(self) -> bool {
        matches!(self, Category::Energy)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Math => "Math",
            Category::Biology => "Biology",
            Category::Chemistry => "Chemistry",
            Category::Physics => "Physics",
            Category::EarthSpace => "Earth and Space",
            Category::Energy => "Energy",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "math" => Some(Category::Math),
            "biology" => Some(Category::Biology),
            "chemistry" => Some(Category::Chemistry),
            "physics" => Some(Category::Physics),
            "earth and space" | "earthspace" | "earth" | "space" => Some(Category::EarthSpace),
            "energy" => Some(Category::Energy),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size table with one slot per category, populated up front.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMap<T> {
    slots: [T; Category::COUNT],
}

impl<T> CategoryMap<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            slots: array::from_fn(|idx| f(Category::ALL[idx])),
        }
    }

    pub fn get(&self, category: Category) -> &T {
        &self.slots[category.index()]
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        &mut self.slots[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.iter().copied().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Category, &mut T)> {
        Category::ALL.iter().copied().zip(self.slots.iter_mut())
    }

    pub fn map<U>(self, mut f: impl FnMut(Category, T) -> U) -> CategoryMap<U> {
        let mut idx = 0;
        CategoryMap {
            slots: self.slots.map(|value| {
                let category = Category::ALL[idx];
                idx += 1;
                f(category, value)
            }),
        }
    }

    pub fn into_entries(self) -> impl Iterator<Item = (Category, T)> {
        Category::ALL.into_iter().zip(self.slots)
    }
}

impl<T: Default> Default for CategoryMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl CategoryMap<usize> {
    pub fn total(&self) -> usize {
        self.slots.iter().sum()
    }
}

impl<T> CategoryMap<Vec<T>> {
    pub fn push(&mut self, category: Category, value: T) {
        self.get_mut(category).push(value);
    }

    pub fn lens(&self) -> CategoryMap<usize> {
        CategoryMap::from_fn(|category| self.get(category).len())
    }
}

impl<T> Index<Category> for CategoryMap<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        self.get(category)
    }
}

impl<T> IndexMut<Category> for CategoryMap<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        self.get_mut(category)
    }
}
