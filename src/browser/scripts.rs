//! In-page JavaScript used by the provided [`Page`](super::Page) methods
//!
//! Function declarations are invoked with `this` bound to the element.

/// Serializable description of an element
pub const DESCRIBE: &str = r#"function () {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    const attributes = {};
    for (const attr of Array.from(this.attributes)) {
        attributes[attr.name] = attr.value;
    }
    const visible = rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && style.opacity !== '0';
    return {
        tag: this.tagName.toLowerCase(),
        text: (this.innerText || this.textContent || this.value || '').trim(),
        attributes,
        visible,
        disabled: !!this.disabled,
        cursor: style.cursor || ''
    };
}"#;

pub const IS_VISIBLE: &str = r#"function () {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && style.opacity !== '0';
}"#;

pub const BOUNDING_BOX: &str = r#"function () {
    const rect = this.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) return null;
    return { x: rect.x, y: rect.y, width: rect.width, height: rect.height };
}"#;

pub const CHECK: &str = r#"function () {
    if (!this.checked) this.click();
    if (!this.checked) {
        this.checked = true;
        this.dispatchEvent(new Event('change', { bubbles: true }));
    }
}"#;

pub const SET_VALUE: &str = r#"function (value) {
    this.value = value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
}"#;

/// Picks the first enabled option with a value, else the first option
pub const SELECT_FIRST_OPTION: &str = r#"function () {
    const options = Array.from(this.options || []);
    const pick = options.find(o => !o.disabled && o.value !== '') || options[0];
    if (!pick) return false;
    this.value = pick.value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
}"#;

pub const DISPATCH_CLICK: &str = r#"function () {
    this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
}"#;

pub const SUBMIT_FORM: &str = r#"function () {
    if (typeof this.requestSubmit === 'function') this.requestSubmit();
    else this.submit();
}"#;

/// Scrolls the element into view and reports its centre and whether the
/// element (or a descendant) is the hit target there
pub const CLICK_POINT: &str = r#"function () {
    this.scrollIntoView({ block: 'center', inline: 'center' });
    const rect = this.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) return null;
    const x = rect.x + rect.width / 2;
    const y = rect.y + rect.height / 2;
    const hit = document.elementFromPoint(x, y);
    return { x, y, hit: !!hit && (hit === this || this.contains(hit)) };
}"#;

pub const FOCUS_AND_CLEAR: &str = r#"function () {
    this.focus();
    if ('value' in this) this.value = '';
}"#;

pub const NOTIFY_CHANGE: &str = r#"function () {
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
}"#;

/// True once the document is loaded and nothing looks busy
pub const FRAMEWORK_READY: &str = r#"(() => {
    if (document.readyState !== 'complete') return false;
    if (document.querySelector('[aria-busy="true"]')) return false;
    const shown = el => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
    };
    const busy = document.querySelectorAll(
        '[class*="loading"], [class*="spinner"], [class*="loader"], [id*="loading"], [id*="spinner"], [role="progressbar"]'
    );
    for (const el of Array.from(busy)) {
        if (shown(el)) return false;
    }
    const pattern = /^(loading|please wait)(\.\.\.|…)?$/i;
    for (const el of Array.from(document.querySelectorAll('body *'))) {
        if (el.children.length === 0 && pattern.test((el.textContent || '').trim()) && shown(el)) return false;
    }
    return true;
})()"#;

/// Pushes fixed navigation bars out of the way of pointer events
pub const DISMISS_OVERLAYS: &str = r#"(() => {
    const overlays = document.querySelectorAll('.navbar-fixed-top, .fixed-top, .sticky-top, .fixed-nav, nav.fixed, header.fixed');
    for (const el of Array.from(overlays)) {
        el.style.pointerEvents = 'none';
        el.style.zIndex = '-1';
    }
    return overlays.length;
})()"#;

/// Observation script. Called as `(binding, token)`.
///
/// Mutations on the body and framework roots, history/hash routing and
/// fetch/XHR activity are reported through the binding as
/// `{"token": ..., "kind": "mutation" | "route" | "network"}`. Installing
/// again tears down the previous observer.
pub const OBSERVER: &str = r#"(binding, token) => {
    const KEY = Symbol.for('dyncrawl.observer');
    const HOOKS = Symbol.for('dyncrawl.hooks');
    if (window[KEY]) window[KEY]();

    const send = kind => {
        try { window[binding](JSON.stringify({ token, kind })); } catch (e) {}
    };

    if (!window[HOOKS]) {
        window[HOOKS] = true;
        const emit = name => window.dispatchEvent(new CustomEvent(name));
        for (const method of ['pushState', 'replaceState']) {
            const original = history[method];
            history[method] = function () {
                const result = original.apply(this, arguments);
                emit('dyncrawl:route');
                return result;
            };
        }
        const originalFetch = window.fetch;
        if (originalFetch) {
            window.fetch = function () {
                emit('dyncrawl:network');
                return originalFetch.apply(this, arguments);
            };
        }
        const originalSend = XMLHttpRequest.prototype.send;
        XMLHttpRequest.prototype.send = function () {
            emit('dyncrawl:network');
            return originalSend.apply(this, arguments);
        };
    }

    const observer = new MutationObserver(() => send('mutation'));
    const roots = [document.body].concat(Array.from(document.querySelectorAll(
        '#root, #app, [data-reactroot], [ng-version], #__next, #__nuxt'
    )));
    for (const root of roots) {
        if (root) observer.observe(root, { childList: true, subtree: true, attributes: true, characterData: true });
    }

    const onRoute = () => send('route');
    const onNetwork = () => send('network');
    window.addEventListener('dyncrawl:route', onRoute);
    window.addEventListener('popstate', onRoute);
    window.addEventListener('hashchange', onRoute);
    window.addEventListener('dyncrawl:network', onNetwork);

    window[KEY] = () => {
        observer.disconnect();
        window.removeEventListener('dyncrawl:route', onRoute);
        window.removeEventListener('popstate', onRoute);
        window.removeEventListener('hashchange', onRoute);
        window.removeEventListener('dyncrawl:network', onNetwork);
        delete window[KEY];
    };
    return true;
}"#;
