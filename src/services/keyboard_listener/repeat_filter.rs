use crate::events::Keycode;
use std::collections::HashSet;

/// Отсеивает события автоповтора X сервера.
///
/// Автоповтор присылает пары release/press, пока клавиша удерживается:
/// нажатие уже нажатой клавиши и отпускание ещё нажатой клавиши - фальшивые.
#[derive(Debug, Default)]
pub struct RepeatFilter {
    pressed: HashSet<Keycode>,
}

impl RepeatFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fake_press(&mut self, keycode: Keycode) -> bool {
        !self.pressed.insert(keycode)
    }

    /// `still_held` - клавиша всё ещё нажата по данным X сервера
    pub fn is_fake_release(&mut self, keycode: Keycode, is_modifier: bool, still_held: bool) -> bool {
        // Модификаторы не повторяются
        if is_modifier {
            return false;
        }
        if still_held {
            return true;
        }
        // Клавиша нажата до захвата клавиатуры: отпускание не наше
        !self.pressed.remove(&keycode)
    }

    /// После снятия захвата отпусканий уже не будет
    pub fn clear(&mut self) {
        self.pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Keycode = Keycode(38);

    #[test]
    fn test_repeated_press_is_fake() {
        let mut filter = RepeatFilter::new();
        assert!(!filter.is_fake_press(A));
        assert!(filter.is_fake_press(A));
        assert!(filter.is_fake_release(A, false, true));
        assert!(!filter.is_fake_release(A, false, false));
        assert!(!filter.is_fake_press(A));
    }

    #[test]
    fn test_unknown_release_is_fake() {
        let mut filter = RepeatFilter::new();
        assert!(filter.is_fake_release(A, false, false));
    }

    #[test]
    fn test_modifiers_never_filtered() {
        let mut filter = RepeatFilter::new();
        assert!(!filter.is_fake_release(Keycode(133), true, true));
        assert!(!filter.is_fake_release(Keycode(133), true, false));
    }

    #[test]
    fn test_clear() {
        let mut filter = RepeatFilter::new();
        filter.is_fake_press(A);
        filter.clear();
        assert!(!filter.is_fake_press(A));
    }
}
