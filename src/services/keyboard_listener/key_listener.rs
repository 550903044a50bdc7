use crate::debug_if_enabled;
use crate::events::{KeyEvent, Keycode, ModMask, WindowId};
use crate::keybinding::{BindingId, BindingSet, KeySequence, PartialMatch};

/// Сработавшее сочетание
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub binding: BindingId,
    pub target: WindowId,
    pub cyclic: bool,
    /// Время события X сервера, вызвавшего срабатывание
    pub time: u32,
}

/// Что нужно сделать с захватом всей клавиатуры
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardGrab {
    Acquire,
    Release,
}

/// Реакция автомата на одно событие клавиатуры
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reaction {
    pub activation: Option<Activation>,
    pub grab: Option<KeyboardGrab>,
}

impl Reaction {
    fn none() -> Self {
        Self::default()
    }

    fn grab(grab: KeyboardGrab) -> Self {
        Self {
            activation: None,
            grab: Some(grab),
        }
    }

    fn fire(activation: Activation, grab: Option<KeyboardGrab>) -> Self {
        Self {
            activation: Some(activation),
            grab,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenerState {
    Idle,
    /// Начало сочетания нажато, клавиатура захвачена
    Pending {
        keycodes: KeySequence,
        modmask: ModMask,
        /// Циклическое сочетание уже сработало, модификаторы всё ещё удерживаются
        cycling: bool,
    },
}

/// Автомат распознавания сочетаний.
///
/// Сам ничего не захватывает: возвращает `Reaction`, которую применяет владелец.
/// События повтора клавиш должны быть отфильтрованы заранее.
#[derive(Debug)]
pub struct KeyListener {
    state: ListenerState,
}

impl Default for KeyListener {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyListener {
    pub fn new() -> Self {
        Self {
            state: ListenerState::Idle,
        }
    }

    #[cfg(test)]

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ListenerState::Pending { .. })
    }

    #[cfg(test)]

    pub fn is_cycling(&self) -> bool {
        matches!(self.state, ListenerState::Pending { cycling: true, .. })
    }

    pub fn on_key_press(&mut self, bindings: &mut BindingSet, event: &KeyEvent) -> Reaction {
        match &mut self.state {
            ListenerState::Idle => {
                let modmask = event.modifiers.relevant();
                let keycodes: KeySequence = std::iter::once(event.keycode).collect();
                if bindings.find_partial(&keycodes, modmask) == PartialMatch::None {
                    return Reaction::none();
                }
                debug_if_enabled!("Начало сочетания: {} ({})", event.keycode, modmask);
                self.state = ListenerState::Pending {
                    keycodes,
                    modmask,
                    cycling: false,
                };
                Reaction::grab(KeyboardGrab::Acquire)
            }
            ListenerState::Pending {
                keycodes,
                modmask,
                cycling,
            } => {
                // Повторное нажатие базовой клавиши во время перебора обработает отпускание
                if *cycling && keycodes.last() == Some(&event.keycode) {
                    return Reaction::none();
                }
                keycodes.push(event.keycode);
                let found = match bindings.find_partial(keycodes, *modmask) {
                    PartialMatch::None => None,
                    PartialMatch::Ambiguous => return Reaction::none(),
                    PartialMatch::Unique(id, binding) => Some(Activation {
                        binding: id,
                        target: binding.target(),
                        cyclic: false,
                        time: event.time,
                    }),
                };
                self.reset(bindings);
                match found {
                    Some(activation) => Reaction::fire(activation, Some(KeyboardGrab::Release)),
                    None => Reaction::grab(KeyboardGrab::Release),
                }
            }
        }
    }

    /// `released_modifier` - биты модификатора отпущенной клавиши, пусто для обычной клавиши
    pub fn on_key_release(&mut self, bindings: &mut BindingSet, event: &KeyEvent, released_modifier: ModMask) -> Reaction {
        let ListenerState::Pending {
            keycodes,
            modmask,
            cycling,
        } = &mut self.state
        else {
            return Reaction::none();
        };

        if keycodes.last() != Some(&event.keycode) {
            // Состояние события снято до отпускания: его собственный бит ещё выставлен
            let still_held = event.modifiers.relevant() & *modmask & !released_modifier;
            if !released_modifier.is_empty() && *cycling && still_held.is_empty() {
                debug_if_enabled!("Модификаторы отпущены, перебор окончен");
                self.reset(bindings);
                return Reaction::grab(KeyboardGrab::Release);
            }
            return Reaction::none();
        }

        let (keycodes, modmask) = (keycodes.clone(), *modmask);

        if let Some((id, binding)) = bindings.find_cyclic(&keycodes, modmask) {
            let activation = Activation {
                binding: id,
                target: binding.target(),
                cyclic: true,
                time: event.time,
            };
            let modifiers_held = !(event.modifiers.relevant() & modmask).is_empty();
            if modifiers_held {
                bindings.set_marker(id);
                if let ListenerState::Pending { cycling, .. } = &mut self.state {
                    *cycling = true;
                }
                return Reaction::fire(activation, None);
            }
            self.reset(bindings);
            return Reaction::fire(activation, Some(KeyboardGrab::Release));
        }

        let found = bindings.find_full(&keycodes, modmask).map(|(id, binding)| Activation {
            binding: id,
            target: binding.target(),
            cyclic: false,
            time: event.time,
        });
        self.reset(bindings);
        match found {
            Some(activation) => Reaction::fire(activation, Some(KeyboardGrab::Release)),
            None => Reaction::grab(KeyboardGrab::Release),
        }
    }

    /// Вернуться в Idle и забыть позицию перебора
    pub fn reset(&mut self, bindings: &mut BindingSet) {
        self.state = ListenerState::Idle;
        bindings.reset_marker();
    }

    /// Последовательность, набранная в текущем сочетании
    #[cfg(test)]
    pub fn pending_keycodes(&self) -> &[Keycode] {
        match &self.state {
            ListenerState::Idle => &[],
            ListenerState::Pending { keycodes, .. } => keycodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybinding::Keybinding;

    const SUPER: ModMask = ModMask::MOD4;
    const SUPER_KEY: Keycode = Keycode(133);
    const X: Keycode = Keycode(53);
    const C: Keycode = Keycode(54);
    const V: Keycode = Keycode(55);
    const F: Keycode = Keycode(41);

    fn bindings(cases: &[(&[u8], u32)]) -> (BindingSet, Vec<BindingId>) {
        let mut set = BindingSet::new();
        let ids = cases
            .iter()
            .map(|(codes, target)| {
                set.add(Keybinding::from_codes(SUPER, codes, WindowId(*target), true).unwrap())
                    .unwrap()
            })
            .collect();
        (set, ids)
    }

    fn press(code: Keycode, mask: ModMask) -> KeyEvent {
        KeyEvent::press(code, mask)
    }

    fn release(code: Keycode, mask: ModMask) -> KeyEvent {
        KeyEvent::release(code, mask)
    }

    fn target(reaction: Reaction) -> Option<u32> {
        reaction.activation.map(|a| a.target.0)
    }

    #[test]
    fn test_unbound_key_ignored() {
        let (mut set, _) = bindings(&[(&[53], 1)]);
        let mut listener = KeyListener::new();

        assert_eq!(listener.on_key_press(&mut set, &press(F, SUPER)), Reaction::none());
        assert_eq!(listener.on_key_press(&mut set, &press(X, ModMask::MOD1)), Reaction::none());
        assert!(!listener.is_pending());
    }

    #[test]
    fn test_single_key_fires_on_release() {
        let (mut set, _) = bindings(&[(&[53], 1), (&[41], 2)]);
        let mut listener = KeyListener::new();

        let reaction = listener.on_key_press(&mut set, &press(F, SUPER | ModMask::MOD2));
        assert_eq!(reaction.grab, Some(KeyboardGrab::Acquire));
        assert!(reaction.activation.is_none());
        assert_eq!(listener.pending_keycodes(), &[F]);

        // Super уже отпущен: перебора не будет
        let reaction = listener.on_key_release(&mut set, &release(F, ModMask::MOD2), ModMask::NONE);
        assert_eq!(target(reaction), Some(2));
        assert_eq!(reaction.grab, Some(KeyboardGrab::Release));
        assert!(!listener.is_pending());
    }

    #[test]
    fn test_two_key_chord_fires_on_press() {
        let (mut set, _) = bindings(&[(&[53], 1), (&[53, 54], 2), (&[53, 55], 3)]);
        let mut listener = KeyListener::new();

        listener.on_key_press(&mut set, &press(X, SUPER));
        let reaction = listener.on_key_press(&mut set, &press(V, SUPER));
        assert_eq!(target(reaction), Some(3));
        assert_eq!(reaction.grab, Some(KeyboardGrab::Release));
        assert!(!listener.is_pending());

        // Отпускания после срабатывания ничего не делают
        assert_eq!(listener.on_key_release(&mut set, &release(V, SUPER), ModMask::NONE), Reaction::none());
        assert_eq!(listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE), Reaction::none());
    }

    #[test]
    fn test_non_matching_second_key_ungrabs() {
        let (mut set, _) = bindings(&[(&[53], 1), (&[53, 54], 2)]);
        let mut listener = KeyListener::new();

        listener.on_key_press(&mut set, &press(X, SUPER));
        let reaction = listener.on_key_press(&mut set, &press(F, SUPER));
        assert_eq!(reaction, Reaction::grab(KeyboardGrab::Release));
        assert!(!listener.is_pending());
    }

    #[test]
    fn test_cycling_while_modifier_held() {
        let (mut set, ids) = bindings(&[(&[53], 1), (&[53, 54], 2), (&[53, 55], 3)]);
        let mut listener = KeyListener::new();

        let mut targets = Vec::new();
        for _ in 0..4 {
            listener.on_key_press(&mut set, &press(X, SUPER));
            let reaction = listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE);
            assert_eq!(reaction.grab, None);
            targets.push(target(reaction).unwrap());
        }
        assert_eq!(targets, vec![1, 2, 3, 1]);
        assert!(listener.is_cycling());
        assert_eq!(set.marker(), Some(ids[0]));

        let reaction = listener.on_key_release(&mut set, &release(SUPER_KEY, SUPER), SUPER);
        assert_eq!(reaction, Reaction::grab(KeyboardGrab::Release));
        assert!(!listener.is_pending());
        assert_eq!(set.marker(), None);
    }

    #[test]
    fn test_non_modifier_release_keeps_cycling() {
        let (mut set, _) = bindings(&[(&[53], 1), (&[53, 54], 2)]);
        let mut listener = KeyListener::new();

        listener.on_key_press(&mut set, &press(X, SUPER));
        listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE);
        assert!(listener.is_cycling());

        assert_eq!(listener.on_key_release(&mut set, &release(C, SUPER), ModMask::NONE), Reaction::none());
        assert!(listener.is_cycling());
    }

    #[test]
    fn test_chord_completed_during_cycling() {
        let (mut set, _) = bindings(&[(&[53], 1), (&[53, 54], 2)]);
        let mut listener = KeyListener::new();

        listener.on_key_press(&mut set, &press(X, SUPER));
        listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE);
        let reaction = listener.on_key_press(&mut set, &press(C, SUPER));
        assert_eq!(target(reaction), Some(2));
        assert!(!listener.is_pending());
    }

    #[test]
    fn test_non_cyclic_binding_fires_on_full_release() {
        let mut set = BindingSet::new();
        set.add(Keybinding::from_codes(SUPER, &[53, 54, 55], WindowId(9), false).unwrap())
            .unwrap();
        set.add(Keybinding::from_codes(SUPER, &[53, 54, 41], WindowId(8), false).unwrap())
            .unwrap();
        let mut listener = KeyListener::new();

        listener.on_key_press(&mut set, &press(X, SUPER));
        assert_eq!(listener.on_key_press(&mut set, &press(C, SUPER)), Reaction::none());
        assert!(listener.is_pending());
        let reaction = listener.on_key_release(&mut set, &release(C, SUPER), ModMask::NONE);
        assert_eq!(reaction, Reaction::grab(KeyboardGrab::Release));
    }

    #[test]
    fn test_cycling_continues_while_any_modifier_held() {
        const CONTROL_KEY: Keycode = Keycode(37);
        let both = SUPER | ModMask::CONTROL;
        let mut set = BindingSet::new();
        for (codes, target) in [(&[53u8][..], 1), (&[53, 54][..], 2)] {
            set.add(Keybinding::from_codes(both, codes, WindowId(target), true).unwrap())
                .unwrap();
        }
        let mut listener = KeyListener::new();

        listener.on_key_press(&mut set, &press(X, both));
        // Control отпущен раньше x, Super ещё нажат
        let reaction = listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE);
        assert_eq!(target(reaction), Some(1));
        assert_eq!(reaction.grab, None);
        assert!(listener.is_cycling());

        listener.on_key_press(&mut set, &press(X, SUPER));
        let reaction = listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE);
        assert_eq!(target(reaction), Some(2));
        assert_eq!(reaction.grab, None);

        // Отпускание Control при нажатом Super перебор не прерывает
        let reaction = listener.on_key_release(&mut set, &release(CONTROL_KEY, both), ModMask::CONTROL);
        assert_eq!(reaction, Reaction::none());
        assert!(listener.is_cycling());

        let reaction = listener.on_key_release(&mut set, &release(SUPER_KEY, SUPER), SUPER);
        assert_eq!(reaction, Reaction::grab(KeyboardGrab::Release));
        assert!(!listener.is_pending());
    }

    #[test]
    fn test_release_when_idle_ignored() {
        let (mut set, _) = bindings(&[(&[53], 1)]);
        let mut listener = KeyListener::new();
        assert_eq!(listener.on_key_release(&mut set, &release(X, SUPER), ModMask::NONE), Reaction::none());
    }
}
